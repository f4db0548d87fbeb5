//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝


#[cfg(test)]
mod passing {
    use mindtouch2zim::library::{parse_page_tree, ContentFilter, ContentFilterOptions, PageTree};
    use serde_json::{json, Value};

    fn node(id: &str, title: &str, path: &str, children: Vec<Value>) -> Value {
        let subpages = if children.is_empty() {
            json!("")
        } else {
            json!({ "page": children })
        };
        json!({
            "@id": id,
            "title": title,
            "path": {"#text": path},
            "subpages": subpages,
        })
    }

    fn library() -> PageTree {
        parse_page_tree(&json!({
            "page": node("1", "Home", "", vec![
                node("2", "Bookshelves", "Bookshelves", vec![
                    node("3", "Geology", "Bookshelves/Geology", vec![
                        node("4", "1: Minerals", "Bookshelves/Geology/1_Minerals", vec![]),
                        node("5", "2: Rocks", "Bookshelves/Geology/2_Rocks", vec![]),
                    ]),
                ]),
                node("6", "Courses", "Courses", vec![
                    node("7", "Minerals 101", "Courses/Minerals_101", vec![]),
                ]),
            ]),
        }))
        .unwrap()
    }

    fn selected(options: ContentFilterOptions) -> Vec<String> {
        ContentFilter::new(&options)
            .unwrap()
            .filter(&library())
            .unwrap()
            .into_iter()
            .map(|page| page.id)
            .collect()
    }

    #[test]
    fn everything_by_default() {
        assert_eq!(selected(ContentFilterOptions::default()), ["1", "2", "3", "4", "5", "6", "7"]);
    }

    #[test]
    fn title_include_brings_ancestors() {
        let ids = selected(ContentFilterOptions {
            page_title_include: Some("minerals".to_string()),
            ..Default::default()
        });
        assert_eq!(ids, ["1", "2", "3", "4", "6", "7"]);
    }

    #[test]
    fn title_or_id() {
        let ids = selected(ContentFilterOptions {
            page_title_include: Some("^2:".to_string()),
            page_id_include: Some("7, 4".to_string()),
            ..Default::default()
        });
        assert_eq!(ids, ["1", "2", "3", "4", "5", "6", "7"]);
    }

    #[test]
    fn exclusion_wins() {
        let ids = selected(ContentFilterOptions {
            page_title_include: Some("minerals".to_string()),
            page_title_exclude: Some("101".to_string()),
            ..Default::default()
        });
        assert_eq!(ids, ["1", "2", "3", "4"]);
    }

    #[test]
    fn root_page_restricts_to_sub_tree() {
        let ids = selected(ContentFilterOptions {
            root_page_id: Some("3".to_string()),
            ..Default::default()
        });
        assert_eq!(ids, ["3", "4", "5"]);
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
    use mindtouch2zim::library::{ContentFilter, ContentFilterOptions, PageTree, Page, TreeError};
    use mindtouch2zim::ConfigError;

    #[test]
    fn invalid_title_regex() {
        let result = ContentFilter::new(&ContentFilterOptions {
            page_title_exclude: Some("[".to_string()),
            ..Default::default()
        });
        assert!(matches!(result, Err(ConfigError::InvalidRegex { .. })));
    }

    #[test]
    fn unknown_root_page() {
        let filter = ContentFilter::new(&ContentFilterOptions {
            root_page_id: Some("404".to_string()),
            ..Default::default()
        })
        .unwrap();
        let tree = PageTree::new(Page::new("1", "Home", ""));

        assert_eq!(filter.filter(&tree).unwrap_err(), TreeError::NotFound("404".to_string()));
    }
}
