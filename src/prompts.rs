//! The fixed instruction prompt sent with every paper.
//!
//! The tag names requested here must stay in sync with
//! [`crate::pipeline::sections::SectionKind`]; the section parser only
//! recognises those tags.

/// Instructions placed before the paper body.
pub const PAPER_PROMPT_HEADER: &str = "please complete the following tasks for the <paper>:
1. Extract the objective and contribution of the paper in one sentence. (In <objective> tags)
2. Extract the implementation details as step-by-step instructions focus on technical details. (In <implementation> tags)
3. Extract the key insights and learnings of the paper as bullet points. (In <insights> tags)
4. Extract the results of the paper in one sentence. (In <results> tags)

";

/// Embed the accumulated paper text into the instruction template.
///
/// Pure: the same text always yields the same prompt. The paper body is
/// inserted verbatim, so braces or tags inside it are never interpreted.
pub fn assemble_prompt(paper: &str) -> String {
    let mut prompt = String::with_capacity(PAPER_PROMPT_HEADER.len() + paper.len() + 16);
    prompt.push_str(PAPER_PROMPT_HEADER);
    prompt.push_str("<paper>");
    prompt.push_str(paper);
    prompt.push_str("</paper>\n");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_is_deterministic() {
        assert_eq!(assemble_prompt("abc\n"), assemble_prompt("abc\n"));
    }

    #[test]
    fn prompt_asks_for_every_section_tag() {
        let p = assemble_prompt("");
        for tag in ["<objective>", "<implementation>", "<insights>", "<results>"] {
            assert!(p.contains(tag), "missing {tag}");
        }
    }

    #[test]
    fn empty_paper_still_well_formed() {
        let p = assemble_prompt("");
        assert!(p.ends_with("<paper></paper>\n"));
        assert!(p.starts_with("please complete the following tasks"));
    }

    #[test]
    fn paper_body_is_not_interpreted() {
        let p = assemble_prompt("{paper} <results>x</results>");
        assert!(p.contains("<paper>{paper} <results>x</results></paper>"));
    }
}
