//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝


#[cfg(test)]
mod passing {
    use mindtouch2zim::library::{parse_home, parse_page_body, parse_page_tree};
    use mindtouch2zim::utils::url::Url;
    use serde_json::json;

    const HOME: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <title>Geosciences LibreTexts</title>
  <link rel="apple-touch-icon" href="https://a.mtstatic.com/@public/production/site_4038/1486479235-apple-touch-icon.png">
  <link rel="shortcut icon" href="https://a.mtstatic.com/@public/production/site_4038/1486479325-favicon.ico">
  <link rel="stylesheet" type="text/css" media="screen" href="/@style/skin.css?v=2">
  <link rel="stylesheet" type="text/css" media="print" href="/@style/print.css?v=2">
  <style type="text/css">.elm-header-custom { display: none; }</style>
  <script type="application/json" id="mt-global-settings">{"apiToken": "xhdhfhd", "pageId": 1}</script>
</head>
<body>
  <header class="elm-header">
    <div class="elm-header-logo-container LTBranding">
      <a href="/"><img src="https://a.mtstatic.com/@public/production/site_4038/1486479235-logo.png" alt="Geosciences"></a>
    </div>
  </header>
</body>
</html>"#;

    #[test]
    fn libretexts_like_home() {
        let home = parse_home(HOME, Url::parse("https://geo.libretexts.org/").unwrap()).unwrap();

        assert_eq!(
            home.welcome_image_url,
            "https://a.mtstatic.com/@public/production/site_4038/1486479235-logo.png"
        );
        assert_eq!(home.screen_css_url, "https://geo.libretexts.org/@style/skin.css?v=2");
        assert_eq!(home.print_css_url, "https://geo.libretexts.org/@style/print.css?v=2");
        assert_eq!(home.inline_css.len(), 1);
        assert_eq!(home.icons_urls.len(), 2);
        assert!(home.icons_urls[0].ends_with("apple-touch-icon.png"));
        assert_eq!(home.api_token, "xhdhfhd");
    }

    #[test]
    fn stylesheets_by_file_name() {
        let content = HOME
            .replace("media=\"screen\" href=\"/@style/skin.css", "href=\"/@style/screen.css")
            .replace("media=\"print\" ", "");
        let home = parse_home(&content, Url::parse("https://geo.libretexts.org/").unwrap()).unwrap();

        assert_eq!(home.screen_css_url, "https://geo.libretexts.org/@style/screen.css?v=2");
        assert_eq!(home.print_css_url, "https://geo.libretexts.org/@style/print.css?v=2");
    }

    #[test]
    fn single_child_subpages() {
        let tree = parse_page_tree(&json!({
            "page": {
                "@id": "15728",
                "title": "Geosciences",
                "path": {"#text": ""},
                "subpages": {
                    "page": {
                        "@id": "28207",
                        "title": "Courses",
                        "path": {"@type": "custom", "#text": "Courses"},
                        "subpages": {
                            "page": [
                                {"@id": "28208", "title": "Geology", "path": {"#text": "Courses/Geology"}, "subpages": ""},
                                {"@id": "28209", "title": "Oceanography", "path": {"#text": "Courses/Oceanography"}, "subpages": ""}
                            ]
                        }
                    }
                }
            }
        }))
        .unwrap();

        assert_eq!(tree.len(), 4);
        assert_eq!(tree.root().id, "15728");
        let courses = tree.get("28207").unwrap();
        let children: Vec<&str> = tree.children(courses).map(|page| page.title.as_str()).collect();
        assert_eq!(children, vec!["Geology", "Oceanography"]);
    }

    #[test]
    fn numeric_ids() {
        let tree = parse_page_tree(&json!({
            "page": {"@id": 1, "title": "Home", "path": "", "subpages": {"page": {"@id": 2, "title": "A", "path": "A"}}}
        }))
        .unwrap();
        assert!(tree.contains("2"));
    }

    #[test]
    fn page_body_variants() {
        assert_eq!(
            parse_page_body(&json!({"@type": "html", "body": "<p>Rocks</p>"})).as_deref(),
            Some("<p>Rocks</p>")
        );
        assert_eq!(
            parse_page_body(&json!({"body": ["<p>Rocks</p>", {"@target": "toc", "#text": "<ol></ol>"}]})).as_deref(),
            Some("<p>Rocks</p>")
        );
    }
}

//  ███████╗ █████╗ ██╗██╗     ██╗███╗   ██╗ ██████╗
//  ██╔════╝██╔══██╗██║██║     ██║████╗  ██║██╔════╝
//  █████╗  ███████║██║██║     ██║██╔██╗ ██║██║  ███╗
//  ██╔══╝  ██╔══██║██║██║     ██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║██║███████╗██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚═╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod failing {
    use mindtouch2zim::library::{parse_home, parse_page_tree, TreeError};
    use mindtouch2zim::utils::url::Url;
    use mindtouch2zim::ScraperError;
    use serde_json::json;

    #[test]
    fn home_without_print_stylesheet() {
        let content = r#"<html><head>
<link rel="stylesheet" media="screen" href="/screen.css">
<script id="mt-global-settings">{"apiToken": "t"}</script>
</head><body><div class="LTBranding"><img src="/logo.png"></div></body></html>"#;

        assert!(matches!(
            parse_home(content, Url::parse("https://www.acme.com/").unwrap()),
            Err(ScraperError::Parsing(message)) if message.contains("print")
        ));
    }

    #[test]
    fn duplicate_page_ids() {
        let result = parse_page_tree(&json!({
            "page": {
                "@id": "1", "title": "Home", "path": "",
                "subpages": {"page": [
                    {"@id": "2", "title": "A", "path": "A"},
                    {"@id": "2", "title": "B", "path": "B"}
                ]}
            }
        }));
        assert_eq!(result.unwrap_err(), TreeError::DuplicateId("2".to_string()));
    }

    #[test]
    fn page_without_id() {
        let result = parse_page_tree(&json!({"page": {"title": "Home", "path": ""}}));
        assert!(matches!(result, Err(TreeError::Malformed(_))));
    }
}
