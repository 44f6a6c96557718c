use ammonia::Builder;

/// Sanitizes and trims a piece of imported text.
///
/// Plain text is stored exactly as written, so `a < b` or `Tom & Jerry`
/// survive unchanged. Only input that actually contains markup goes through
/// ammonia with an empty tag whitelist: tags are dropped, the text between
/// them is kept, and `<script>`/`<style>` lose their content too.
pub fn clean_text(input: &str) -> String {
    let trimmed = input.trim();
    if !ammonia::is_html(trimmed) {
        return trimmed.to_string();
    }

    let stripped = Builder::empty().clean(trimmed).to_string();
    unescape_text(&stripped).trim().to_string()
}

/// Reverses the escaping the serializer applies to text nodes.
/// `&amp;` goes last so an escaped literal entity is not decoded twice.
fn unescape_text(escaped: &str) -> String {
    escaped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_kept_verbatim() {
        assert_eq!(clean_text("  Is 5 > 3 && 2 < 4?  "), "Is 5 > 3 && 2 < 4?");
        assert_eq!(clean_text("Tom & Jerry"), "Tom & Jerry");
        assert_eq!(clean_text("a &lt; b"), "a &lt; b");
    }

    #[test]
    fn markup_is_stripped_and_text_unescaped() {
        assert_eq!(
            clean_text("<b>Bold</b> & brave<script>alert(1)</script>"),
            "Bold & brave"
        );
        assert_eq!(clean_text("<i>x</i> &lt;y &amp;amp;"), "x <y &amp;");
    }

    #[test]
    fn event_handlers_do_not_survive() {
        let cleaned = clean_text(r#"<img src=x onerror="alert(1)">Pick one"#);
        assert_eq!(cleaned, "Pick one");
    }
}
