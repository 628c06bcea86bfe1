use crate::domain::TitleRejection;

/// Turn a page title into a search query.
///
/// Rejects empty titles, the site's own default title and loading
/// placeholders; otherwise strips a trailing " | Site" or " - Site"
/// decoration and returns the rest untouched.
pub fn extract_query(
    title: &str,
    site_name: &str,
    loading_marker: &str,
) -> Result<String, TitleRejection> {
    if title.trim().is_empty() {
        return Err(TitleRejection::Empty);
    }
    if title == site_name {
        return Err(TitleRejection::Generic);
    }
    if !loading_marker.is_empty() && title.contains(loading_marker) {
        return Err(TitleRejection::Loading);
    }

    let mut query = title;
    for separator in [" | ", " - "] {
        let decoration = format!("{}{}", separator, site_name);
        if let Some(stripped) = query.strip_suffix(decoration.as_str()) {
            query = stripped;
        }
    }

    if query.trim().is_empty() {
        return Err(TitleRejection::Empty);
    }
    Ok(query.to_string())
}

/// Sanitize filename to remove invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = "Samplette";
    const LOADING: &str = "Loading";

    #[test]
    fn test_strips_pipe_decoration() {
        let query = extract_query("Daft Punk - One More Time | Samplette", SITE, LOADING).unwrap();
        assert_eq!(query, "Daft Punk - One More Time");
    }

    #[test]
    fn test_strips_dash_decoration() {
        let query = extract_query("Aphex Twin - Xtal - Samplette", SITE, LOADING).unwrap();
        assert_eq!(query, "Aphex Twin - Xtal");
    }

    #[test]
    fn test_plain_title_is_unchanged() {
        let query = extract_query("  J Dilla - Donuts  ", SITE, LOADING).unwrap();
        assert_eq!(query, "  J Dilla - Donuts  ");
    }

    #[test]
    fn test_decoration_only_stripped_at_end() {
        let query = extract_query("Samplette | Samplette Mix", SITE, LOADING).unwrap();
        assert_eq!(query, "Samplette | Samplette Mix");
    }

    #[test]
    fn test_rejections() {
        assert_eq!(extract_query("", SITE, LOADING), Err(TitleRejection::Empty));
        assert_eq!(extract_query("   ", SITE, LOADING), Err(TitleRejection::Empty));
        assert_eq!(extract_query("Samplette", SITE, LOADING), Err(TitleRejection::Generic));
        assert_eq!(
            extract_query("Loading sample... | Samplette", SITE, LOADING),
            Err(TitleRejection::Loading)
        );
        assert_eq!(extract_query(" | Samplette", SITE, LOADING), Err(TitleRejection::Empty));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("AC/DC: Back In Black"), "AC_DC_ Back In Black");
        assert_eq!(sanitize_filename("normal-name.wav"), "normal-name.wav");
    }
}
