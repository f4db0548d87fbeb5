//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝


#[cfg(test)]
mod passing {
    use std::collections::HashMap;

    use mindtouch2zim::library::{parse_page_tree, ContentFilter, ContentFilterOptions, Page};
    use mindtouch2zim::network::FetchError;
    use mindtouch2zim::parsers::html::ThumbnailResolver;
    use mindtouch2zim::parsers::{rewrite_page, RewriteError, UrlRewriter};
    use mindtouch2zim::utils::url::Url;
    use mindtouch2zim::{process_pages, PageOutcome, ScraperError};
    use serde_json::json;

    struct NoVideos;

    impl ThumbnailResolver for NoVideos {
        fn vimeo_thumbnail_url(&self, video_url: &str) -> Result<String, RewriteError> {
            Err(RewriteError::VimeoThumbnail {
                url: video_url.to_string(),
                reason: "offline".to_string(),
            })
        }
    }

    fn selected_pages() -> Vec<Page> {
        let tree = parse_page_tree(&json!({
            "page": {
                "@id": "1", "title": "Home", "path": "",
                "subpages": {"page": [
                    {
                        "@id": "2", "title": "Private shelf", "path": "Private",
                        "subpages": {"page": {
                            "@id": "3", "title": "Hidden book", "path": "Private/Book",
                            "subpages": {"page": {"@id": "4", "title": "Hidden chapter", "path": "Private/Book/Chapter"}}
                        }}
                    },
                    {"@id": "5", "title": "Flash demo", "path": "Flash"},
                    {"@id": "6", "title": "Public", "path": "Public"}
                ]}
            }
        }))
        .unwrap();
        ContentFilter::new(&ContentFilterOptions::default())
            .unwrap()
            .filter(&tree)
            .unwrap()
    }

    fn fetch_or_rewrite(page: &Page) -> Result<(), ScraperError> {
        match page.id.as_str() {
            "2" => Err(ScraperError::Fetch(FetchError::Status {
                url: "https://www.acme.com/@api/deki/pages/2/contents".to_string(),
                status: 403,
            })),
            "3" | "4" => panic!("page {} below a private page was fetched", page.id),
            "5" => Err(ScraperError::Rewrite {
                page_id: page.id.clone(),
                source: RewriteError::UnsupportedTag {
                    tag: "object".to_string(),
                },
            }),
            _ => Ok(()),
        }
    }

    #[test]
    fn private_and_unsupported_pages_are_skipped() {
        let pages = selected_pages();
        let outcomes = process_pages(&pages, fetch_or_rewrite, true).unwrap();

        assert_eq!(
            outcomes,
            vec![
                PageOutcome::Processed,
                PageOutcome::Forbidden,
                PageOutcome::SkippedPrivateParent,
                PageOutcome::SkippedPrivateParent,
                PageOutcome::Unsupported,
                PageOutcome::Processed,
            ]
        );
    }

    #[test]
    fn skipped_pages_leave_no_assets_behind() {
        let library = Url::parse("https://www.acme.com/").unwrap();
        let mut url_rewriter = UrlRewriter::new(&library, []);
        let pages = vec![
            Page::new("1", "Home", ""),
            Page::new("2", "Gallery", "Gallery"),
            Page::new("3", "Photos", "Photos"),
        ];
        let bodies = HashMap::from([
            ("1", "<p>Welcome</p>"),
            (
                "2",
                "<img src=\"/img/cover.png?size=large\"><img src=\"/img/banner.png\"><picture><img src=\"/img/wide.png\"></picture>",
            ),
            ("3", "<img src=\"/img/cover.png\">"),
        ]);

        let outcomes = process_pages(
            &pages,
            |page| {
                let page_url = Url::parse(&format!("https://www.acme.com/{}", page.path)).unwrap();
                url_rewriter.transaction(|url_rewriter| {
                    rewrite_page(url_rewriter, &NoVideos, bodies[page.id.as_str()], &page_url)
                        .map(|_| ())
                        .map_err(|source| ScraperError::Rewrite {
                            page_id: page.id.clone(),
                            source,
                        })
                })
            },
            true,
        )
        .unwrap();
        assert_eq!(
            outcomes,
            vec![PageOutcome::Processed, PageOutcome::Unsupported, PageOutcome::Processed]
        );

        let items = url_rewriter.into_items_to_download();
        let paths: Vec<&str> = items.keys().map(|path| path.as_str()).collect();
        assert_eq!(paths, vec!["www.acme.com/img/cover.png"]);
        let urls: Vec<&str> = items
            .values()
            .flat_map(|details| details.urls.iter().map(|url| url.as_str()))
            .collect();
        assert_eq!(urls, vec!["https://www.acme.com/img/cover.png"]);
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
    use mindtouch2zim::library::Page;
    use mindtouch2zim::network::FetchError;
    use mindtouch2zim::{process_pages, ErrorCategory, ScraperError};

    fn forbidden() -> ScraperError {
        ScraperError::Fetch(FetchError::Status {
            url: "https://www.acme.com/@api/deki/pages/1/contents".to_string(),
            status: 403,
        })
    }

    #[test]
    fn private_root() {
        let pages = vec![Page::new("1", "Home", "")];
        let err = process_pages(&pages, |_| Err(forbidden()), false).unwrap_err();

        assert!(matches!(err, ScraperError::RootForbidden(ref id) if id == "1"));
        assert_eq!(err.category(), ErrorCategory::Content);
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    fn server_errors_are_not_private_pages() {
        let pages = vec![Page::new("1", "Home", ""), Page::new("2", "A", "A")];
        let err = process_pages(
            &pages,
            |page| {
                if page.id == "2" {
                    Err(ScraperError::Fetch(FetchError::Status {
                        url: "https://www.acme.com/@api/deki/pages/2/contents".to_string(),
                        status: 500,
                    }))
                } else {
                    Ok(())
                }
            },
            true,
        )
        .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Network);
    }
}
