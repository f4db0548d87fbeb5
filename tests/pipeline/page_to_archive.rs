//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝


#[cfg(test)]
mod passing {
    use std::collections::HashMap;
    use std::fs;
    use std::io::Cursor;
    use std::sync::Mutex;
    use std::time::Duration;

    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use mindtouch2zim::archive::{ArchiveItem, ArchiveWriter, DirectoryArchive};
    use mindtouch2zim::assets::AssetProcessor;
    use mindtouch2zim::network::{AssetFetcher, FetchError, HeaderData, RetryPolicy};
    use mindtouch2zim::parsers::html::{rewrite_page, RewriteError, ThumbnailResolver};
    use mindtouch2zim::parsers::UrlRewriter;
    use mindtouch2zim::processor::{add_mathjax, process_css, process_imported_stylesheets};
    use mindtouch2zim::progress::Progress;
    use mindtouch2zim::utils::url::Url;
    use mindtouch2zim::ScraperOptions;

    struct NoVideos;

    impl ThumbnailResolver for NoVideos {
        fn vimeo_thumbnail_url(&self, video_url: &str) -> Result<String, RewriteError> {
            Err(RewriteError::VimeoThumbnail {
                url: video_url.to_string(),
                reason: "offline".to_string(),
            })
        }
    }

    /// url -> (content type, body); anything else answers 404
    struct StaticSite(HashMap<String, (String, Vec<u8>)>);

    impl StaticSite {
        fn get(&self, url: &str) -> Result<&(String, Vec<u8>), FetchError> {
            self.0.get(url).ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    impl AssetFetcher for StaticSite {
        fn probe(&self, url: &str, _retry: &RetryPolicy) -> Result<HeaderData, FetchError> {
            Ok(HeaderData {
                content_type: Some(self.get(url)?.0.clone()),
                ident: "\"v1\"".to_string(),
            })
        }

        fn download(&self, url: &str, _retry: &RetryPolicy) -> Result<Vec<u8>, FetchError> {
            Ok(self.get(url)?.1.clone())
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([10, 200, 30])))
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn page_and_stylesheet_assets_end_up_in_archive() {
        let library = Url::parse("https://www.acme.com/").unwrap();
        let mut url_rewriter = UrlRewriter::new(&library, []);

        let css = process_css(
            &mut url_rewriter,
            "screen.css",
            "https://www.acme.com/styles/screen.css",
            "body { background: url(bg.gif) }",
        )
        .unwrap();
        assert_eq!(css, "body { background: url(css_assets/styles/bg.gif) }");

        url_rewriter.add_existing_pages(&library, ["Topic_1"]);
        let page_url = Url::parse("https://www.acme.com/Home").unwrap();
        let page = rewrite_page(
            &mut url_rewriter,
            &NoVideos,
            "<p>Intro</p><img src=\"/img/photo.png\"><a href=\"/Topic_1\">Topic</a><img src=\"/img/missing.png\">",
            &page_url,
        )
        .unwrap();
        assert_eq!(
            page.html,
            "<p>Intro</p><img src=\"content/www.acme.com/img/photo.png\"><a href=\"#/Topic_1\">Topic</a><img src=\"content/www.acme.com/img/missing.png\">"
        );
        assert_eq!(page.text, "Intro Topic");

        let gif = b"GIF89a-not-decoded".to_vec();
        let site = StaticSite(HashMap::from([
            (
                "https://www.acme.com/img/photo.png".to_string(),
                ("image/png".to_string(), png(1280, 640)),
            ),
            (
                "https://www.acme.com/styles/bg.gif".to_string(),
                ("image/gif".to_string(), gif.clone()),
            ),
        ]));

        let output = tempfile::tempdir().unwrap();
        let mut archive = DirectoryArchive::create(output.path(), "acme", "index.html").unwrap();
        archive
            .add_item(ArchiveItem::bytes("index.html", "<html></html>").front())
            .unwrap();
        archive
            .add_item(ArchiveItem::bytes("content/screen.css", css).with_mimetype("text/css"))
            .unwrap();

        let options = ScraperOptions::default();
        let processor = AssetProcessor::new(&options, &site).unwrap();
        let archive = Mutex::new(archive);
        let progress = Progress::new(None, Duration::from_secs(60));
        let items = url_rewriter.into_items_to_download();
        let stats = processor.process_all(&items, &archive, &progress).unwrap();

        assert_eq!((stats.stored, stats.skipped, stats.failed), (2, 0, 1));
        assert_eq!(progress.done(), 3);

        let destination = archive.into_inner().unwrap().finish().unwrap();

        // Page images are optimized, stylesheet assets are stored as fetched
        let photo = fs::read(destination.join("content/www.acme.com/img/photo.png")).unwrap();
        assert_eq!(&photo[8..12], b"WEBP");
        let optimized = image::load_from_memory(&photo).unwrap();
        assert_eq!((optimized.width(), optimized.height()), (640, 320));

        assert_eq!(
            fs::read(destination.join("content/css_assets/styles/bg.gif")).unwrap(),
            gif
        );
        assert!(!destination.join("content/www.acme.com/img/missing.png").exists());
    }

    #[test]
    fn imported_stylesheets_are_rewritten_against_their_own_url() {
        let library = Url::parse("https://www.acme.com/").unwrap();
        let mut url_rewriter = UrlRewriter::new(&library, []);
        let screen = process_css(
            &mut url_rewriter,
            "screen.css",
            "https://www.acme.com/styles/screen.css",
            "@import url(\"theme/base.css\"); @import \"missing.css\"; body { background: url(bg.gif) }",
        )
        .unwrap();
        assert!(screen.contains("css_assets/styles/theme/base.css"), "{}", screen);

        let sheets = HashMap::from([
            (
                "https://www.acme.com/styles/theme/base.css",
                "@import \"/shared/fonts.css\"; h1 { background: url(/img/title.png) }",
            ),
            (
                "https://www.acme.com/shared/fonts.css",
                "@font-face { src: url(https://fonts.acme.org/roboto.woff2) }",
            ),
        ]);

        let output = tempfile::tempdir().unwrap();
        let mut archive = DirectoryArchive::create(output.path(), "acme", "index.html").unwrap();
        let stored = process_imported_stylesheets(&mut url_rewriter, &mut archive, |url| {
            sheets.get(url).map(|css| css.to_string()).ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        })
        .unwrap();
        assert_eq!(stored, 2);

        assert!(archive.contains("content/css_assets/styles/theme/base.css"));
        assert!(archive.contains("content/css_assets/shared/fonts.css"));
        archive.add_item(ArchiveItem::bytes("index.html", "<html></html>").front()).unwrap();
        let destination = archive.finish().unwrap();

        let base = fs::read_to_string(destination.join("content/css_assets/styles/theme/base.css")).unwrap();
        assert!(base.contains("../../shared/fonts.css"), "{}", base);
        assert!(base.contains("url(../../img/title.png)"), "{}", base);
        let fonts = fs::read_to_string(destination.join("content/css_assets/shared/fonts.css")).unwrap();
        assert!(fonts.contains("url(../roboto.woff2)"), "{}", fonts);

        // stored sheets leave the download list, the unreachable one stays
        let remaining: Vec<&str> = url_rewriter
            .items_to_download()
            .keys()
            .map(|path| path.as_str())
            .collect();
        assert_eq!(
            remaining,
            vec![
                "css_assets/img/title.png",
                "css_assets/roboto.woff2",
                "css_assets/styles/bg.gif",
                "css_assets/styles/missing.css",
            ]
        );
    }

    #[test]
    fn mathjax_bundle_is_stored_under_its_directory() {
        let dist = tempfile::tempdir().unwrap();
        fs::create_dir_all(dist.path().join("es5/output/chtml")).unwrap();
        fs::write(dist.path().join("es5/tex-svg.js"), "window.MathJax = {};").unwrap();
        fs::write(dist.path().join("es5/output/chtml/fonts.js"), "// fonts").unwrap();

        let output = tempfile::tempdir().unwrap();
        let mut archive = DirectoryArchive::create(output.path(), "acme", "index.html").unwrap();
        let progress = Progress::new(None, Duration::from_secs(60));

        let added = add_mathjax(&mut archive, dist.path(), &progress).unwrap();

        assert_eq!(added, 2);
        assert!(archive.contains("mathjax/es5/tex-svg.js"));
        assert!(archive.contains("mathjax/es5/output/chtml/fonts.js"));
        archive.add_item(ArchiveItem::bytes("index.html", "<html></html>").front()).unwrap();
        let destination = archive.finish().unwrap();
        assert_eq!(
            fs::read_to_string(destination.join("mathjax/es5/tex-svg.js")).unwrap(),
            "window.MathJax = {};"
        );
        // directories count as progress items too
        assert_eq!(progress.total(), 5);
        assert_eq!(progress.done(), 5);
    }

    #[test]
    fn asset_failures_over_threshold_abort() {
        let library = Url::parse("https://www.acme.com/").unwrap();
        let mut url_rewriter = UrlRewriter::new(&library, []);
        let page_url = Url::parse("https://www.acme.com/Home").unwrap();
        rewrite_page(
            &mut url_rewriter,
            &NoVideos,
            "<img src=\"/a.png\"><img src=\"/b.png\"><img src=\"/c.png\">",
            &page_url,
        )
        .unwrap();

        let options = ScraperOptions {
            bad_assets_threshold: 2,
            ..Default::default()
        };
        let site = StaticSite(HashMap::new());
        let processor = AssetProcessor::new(&options, &site).unwrap();

        let output = tempfile::tempdir().unwrap();
        let archive = Mutex::new(DirectoryArchive::create(output.path(), "acme", "index.html").unwrap());
        let progress = Progress::new(None, Duration::from_secs(60));

        let result = processor.process_all(url_rewriter.items_to_download(), &archive, &progress);
        assert!(result.is_err());
        assert_eq!(processor.failures(), 3);
    }
}
