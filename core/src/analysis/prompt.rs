/// Substitute `{device}` and `{capture}` into `template`.
///
/// Placeholders inside the capture text itself are left alone.
pub fn render_prompt(template: &str, device_id: &str, capture: &str) -> String {
    template
        .split("{capture}")
        .map(|part| part.replace("{device}", device_id))
        .collect::<Vec<_>>()
        .join(capture)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitutes_both_placeholders() {
        let out = render_prompt("Check {device}:\n{capture}\nEnd {device}", "sw1", "LOG");
        assert_eq!(out, "Check sw1:\nLOG\nEnd sw1");
    }

    #[test]
    fn test_capture_text_is_not_rescanned() {
        let out = render_prompt("{device}: {capture}", "sw1", "literal {device}");
        assert_eq!(out, "sw1: literal {device}");
    }

    #[test]
    fn test_default_template_has_placeholders() {
        let t = crate::config::default_prompt_template();
        assert!(t.contains("{device}") && t.contains("{capture}"));
    }
}
