//! Page HTML rewriting
//!
//! Page bodies come from the MindTouch API as HTML fragments. Every
//! reference they hold is made to work inside the archive: images are
//! registered for download, links to exported pages point to the viewer
//! route, video players become thumbnails. Constructs that cannot be made to
//! work offline are rejected.

use html5ever::tendril::StrTendril;
use html5ever::tree_builder::NodeOrText;
use markup5ever_rcdom::{Handle, RcDom};
use thiserror::Error;
use tracing::debug;

use super::dom::{
    append_child, append_text, extract_text, find_nodes, fragment_root, fragment_to_dom,
    get_node_attr, get_node_name, new_element, replace_node, set_node_attr,
};
use super::parser::best_srcset_candidate;
use super::serializer::serialize_children;
use super::video::{ThumbnailResolver, VideoEmbed};
use crate::parsers::url_rewriter::{AssetLayout, DocumentContext, UrlRewriter};
use crate::utils::url::{is_http, Url};

/// Archive path pages are rendered from by the viewer.
pub const PAGE_DOCUMENT_PATH: &str = "index.html";

const OFFLINE_NOTICE: &str = "This content is not inside the ZIM. View content online at ";

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("<{tag}> tags are not supported")]
    UnsupportedTag { tag: String },

    #[error("unsupported {attr} on <{tag}>: {value}")]
    UnsupportedHrefSrc {
        tag: String,
        attr: String,
        value: String,
    },

    #[error("unable to get thumbnail of Vimeo video {url}: {reason}")]
    VimeoThumbnail { url: String, reason: String },
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RewrittenPage {
    pub html: String,
    /// Plain text, for full-text indexing
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TagKind {
    Img,
    Iframe,
    Anchor,
    Base,
    Picture,
    Other,
}

impl TagKind {
    fn of(tag: &str) -> TagKind {
        match tag {
            "img" => TagKind::Img,
            "iframe" => TagKind::Iframe,
            "a" => TagKind::Anchor,
            "base" => TagKind::Base,
            "picture" => TagKind::Picture,
            _ => TagKind::Other,
        }
    }
}

pub struct HtmlRewriter<'a> {
    url_rewriter: &'a mut UrlRewriter,
    thumbnails: &'a dyn ThumbnailResolver,
}

impl<'a> HtmlRewriter<'a> {
    pub fn new(
        url_rewriter: &'a mut UrlRewriter,
        thumbnails: &'a dyn ThumbnailResolver,
    ) -> HtmlRewriter<'a> {
        HtmlRewriter {
            url_rewriter,
            thumbnails,
        }
    }

    /// Rewrites the body of the page published at `page_url`.
    ///
    /// Assets found along the way are registered on the URL rewriter.
    pub fn rewrite(&mut self, html: &str, page_url: &Url) -> Result<RewrittenPage, RewriteError> {
        let dom = fragment_to_dom(html);
        let Some(root) = fragment_root(&dom) else {
            return Ok(RewrittenPage::default());
        };

        let base_href = find_nodes(&root, &["base"])
            .first()
            .and_then(|base| get_node_attr(base, "href"));
        let document =
            DocumentContext::new(page_url, PAGE_DOCUMENT_PATH).with_base_href(base_href.as_deref());

        self.walk(&dom, &root, &document)?;

        Ok(RewrittenPage {
            html: serialize_children(&root),
            text: extract_text(&root),
        })
    }

    fn walk(&mut self, dom: &RcDom, node: &Handle, document: &DocumentContext) -> Result<(), RewriteError> {
        let children: Vec<Handle> = node.children.borrow().clone();

        for child in children.iter() {
            let Some(tag) = get_node_name(child).map(str::to_string) else {
                continue;
            };

            match TagKind::of(&tag) {
                TagKind::Img => self.rewrite_img(child, document),
                TagKind::Iframe => {
                    // Replaced as a whole, nothing left to descend into
                    self.rewrite_iframe(dom, child, document)?;
                    continue;
                }
                TagKind::Anchor => self.rewrite_anchor(child, document),
                TagKind::Base => {}
                TagKind::Picture => return Err(RewriteError::UnsupportedTag { tag }),
                TagKind::Other => self.check_external_references(&tag, child, document)?,
            }

            self.walk(dom, child, document)?;
        }

        Ok(())
    }

    fn rewrite_img(&mut self, node: &Handle, document: &DocumentContext) {
        let srcset = get_node_attr(node, "srcset").filter(|srcset| !srcset.trim().is_empty());
        let source = match srcset {
            Some(srcset) => best_srcset_candidate(&srcset).map(str::to_string),
            None => get_node_attr(node, "src"),
        };
        let Some(source) = source else {
            return;
        };

        let result = self
            .url_rewriter
            .rewrite_asset(&source, document, AssetLayout::Mirror);

        set_node_attr(node, "src", None);
        set_node_attr(node, "srcset", None);
        set_node_attr(node, "sizes", None);
        set_node_attr(node, "src", Some(result.rewritten));
    }

    fn rewrite_anchor(&mut self, node: &Handle, document: &DocumentContext) {
        if let Some(href) = get_node_attr(node, "href") {
            let rewritten = self.url_rewriter.rewrite_link(&href, document);
            set_node_attr(node, "href", Some(rewritten));
        }
    }

    fn rewrite_iframe(
        &mut self,
        dom: &RcDom,
        node: &Handle,
        document: &DocumentContext,
    ) -> Result<(), RewriteError> {
        let Some(src) = get_node_attr(node, "src").filter(|src| !src.trim().is_empty()) else {
            return Ok(());
        };
        let absolute = self.url_rewriter.resolve(&src, document);
        let online_url = absolute
            .as_ref()
            .map(|url| url.to_string())
            .unwrap_or_else(|| src.clone());

        let mut replacements = Vec::new();
        match absolute.as_ref().and_then(VideoEmbed::detect) {
            Some(embed) => {
                let thumbnail_url = embed.thumbnail_url(self.thumbnails)?;
                let thumbnail =
                    self.url_rewriter
                        .rewrite_asset(&thumbnail_url, document, AssetLayout::Mirror);

                let link = new_element(dom, "a", &[("href", online_url.as_str()), ("target", "_blank")]);
                let wrapper = new_element(dom, "div", &[("class", "zim-removed-video")]);
                let image = new_element(dom, "img", &[("src", thumbnail.rewritten.as_str())]);
                append_child(dom, &wrapper, image);
                append_child(dom, &link, wrapper);
                replacements.push(NodeOrText::AppendNode(link));
            }
            None => {
                debug!("replacing unsupported iframe {}", online_url);
                let link = new_element(dom, "a", &[("href", online_url.as_str()), ("target", "_blank")]);
                let label = new_element(dom, "div", &[]);
                append_text(dom, &label, &online_url);
                append_child(dom, &link, label);
                replacements.push(NodeOrText::AppendText(StrTendril::from(OFFLINE_NOTICE)));
                replacements.push(NodeOrText::AppendNode(link));
            }
        }
        replacements.push(NodeOrText::AppendNode(new_element(
            dom,
            "iframe",
            &[("style", "display: none;")],
        )));

        replace_node(dom, node, replacements);
        Ok(())
    }

    /// Any other element pulling an http(s) resource would break offline.
    fn check_external_references(
        &self,
        tag: &str,
        node: &Handle,
        document: &DocumentContext,
    ) -> Result<(), RewriteError> {
        for attr in ["src", "href"] {
            let Some(value) = get_node_attr(node, attr) else {
                continue;
            };
            let trimmed = value.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some(absolute) = self.url_rewriter.resolve(trimmed, document) {
                if is_http(&absolute) {
                    return Err(RewriteError::UnsupportedHrefSrc {
                        tag: tag.to_string(),
                        attr: attr.to_string(),
                        value,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Rewrites a page body with a fresh [`HtmlRewriter`].
pub fn rewrite_page(
    url_rewriter: &mut UrlRewriter,
    thumbnails: &dyn ThumbnailResolver,
    html: &str,
    page_url: &Url,
) -> Result<RewrittenPage, RewriteError> {
    HtmlRewriter::new(url_rewriter, thumbnails).rewrite(html, page_url)
}
