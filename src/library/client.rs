//! MindTouch site API client
//!
//! The home page is scraped for branding and stylesheets; everything else
//! comes from the `@api/deki` JSON API, authenticated with the token the
//! home page embeds. API responses are cached on disk so that an interrupted
//! run restarts without hammering the site.

use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use markup5ever_rcdom::Handle;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::tree::{Page, PageTree, TreeError};
use crate::core::ScraperError;
use crate::network::Session;
use crate::parsers::html::dom::{find_nodes, get_node_attr, has_class, html_to_dom};
use crate::parsers::html::utils::is_favicon;
use crate::utils::url::{resolve_url, Url};

const GLOBAL_SETTINGS_ID: &str = "mt-global-settings";
const DEKI_TOKEN_HEADER: &str = "x-deki-token";

/// What the library home page tells about the library.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MindtouchHome {
    pub home_url: Url,
    pub welcome_image_url: String,
    pub screen_css_url: String,
    pub print_css_url: String,
    pub inline_css: Vec<String>,
    /// Best candidates first
    pub icons_urls: Vec<String>,
    pub api_token: String,
}

pub struct MindtouchClient<'a> {
    library_url: Url,
    session: &'a Session,
    cache_dir: PathBuf,
    api_token: OnceLock<String>,
}

impl<'a> MindtouchClient<'a> {
    pub fn new(library_url: Url, session: &'a Session, cache_dir: PathBuf) -> MindtouchClient<'a> {
        MindtouchClient {
            library_url,
            session,
            cache_dir,
            api_token: OnceLock::new(),
        }
    }

    /// Library URL without trailing slash.
    pub fn library_url(&self) -> &str {
        self.library_url.as_str().trim_end_matches('/')
    }

    pub fn api_url(&self) -> String {
        format!("{}/@api/deki", self.library_url())
    }

    pub fn page_url(&self, page: &Page) -> Result<Url, ScraperError> {
        Url::parse(&format!("{}/{}", self.library_url(), page.path))
            .map_err(|err| ScraperError::Parsing(format!("invalid URL for page {}: {}", page.id, err)))
    }

    pub fn get_home(&self) -> Result<MindtouchHome, ScraperError> {
        let home_url = Url::parse(&format!("{}/", self.library_url()))
            .map_err(|err| ScraperError::Parsing(err.to_string()))?;
        let content = self.session.get_text(home_url.as_str())?;
        let home = parse_home(&content, home_url)?;

        let _ = self.api_token.set(home.api_token.clone());
        Ok(home)
    }

    fn api_token(&self) -> Result<&str, ScraperError> {
        if let Some(token) = self.api_token.get() {
            return Ok(token.as_str());
        }

        let home = self.get_home()?;
        Ok(self.api_token.get_or_init(|| home.api_token).as_str())
    }

    fn cache_file(&self, url: &str) -> PathBuf {
        let digest: String = Sha256::digest(url.as_bytes())
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect();
        self.cache_dir.join(format!("{}.json", digest))
    }

    /// GETs an API resource as JSON, through the on-disk cache.
    fn api_json(&self, sub_path_and_query: &str) -> Result<Value, ScraperError> {
        let url = format!("{}/{}", self.api_url(), sub_path_and_query);
        let cache_file = self.cache_file(&url);

        if let Ok(cached) = fs::read(&cache_file) {
            match serde_json::from_slice(&cached) {
                Ok(value) => {
                    debug!("using cached response for {}", url);
                    return Ok(value);
                }
                Err(err) => warn!("ignoring corrupted cache file {}: {}", cache_file.display(), err),
            }
        }

        debug!("calling API at {}", url);
        let token = self.api_token()?;
        let value = self.session.get_json(&url, &[(DEKI_TOKEN_HEADER, token)])?;

        let stored = fs::create_dir_all(&self.cache_dir)
            .and_then(|()| fs::write(&cache_file, value.to_string()));
        if let Err(err) = stored {
            warn!("failed to cache API response in {}: {}", cache_file.display(), err);
        }

        Ok(value)
    }

    pub fn get_page_tree(&self) -> Result<PageTree, ScraperError> {
        let document = self.api_json("pages/home/tree?dream.out.format=json")?;
        Ok(parse_page_tree(&document)?)
    }

    /// Rendered HTML body of a page.
    ///
    /// A private page answers HTTP 403, see [`crate::network::FetchError::is_forbidden`].
    pub fn get_page_content(&self, page: &Page) -> Result<String, ScraperError> {
        let document = self.api_json(&format!(
            "pages/{}/contents?dream.out.format=json&mode=view:html",
            page.id
        ))?;
        parse_page_body(&document)
            .ok_or_else(|| ScraperError::Parsing(format!("no body in content of page {}", page.id)))
    }
}

fn absolute(home_url: &Url, value: &str) -> Option<String> {
    resolve_url(home_url, value).ok().map(|url| url.to_string())
}

fn rel_values(node: &Handle) -> Vec<String> {
    get_node_attr(node, "rel")
        .map(|rel| rel.split_whitespace().map(str::to_lowercase).collect())
        .unwrap_or_default()
}

fn node_text(node: &Handle) -> String {
    node.children
        .borrow()
        .iter()
        .filter_map(|child| match &child.data {
            markup5ever_rcdom::NodeData::Text { contents } => Some(contents.borrow().to_string()),
            _ => None,
        })
        .collect()
}

/// Extracts branding, stylesheets and API token from the home page HTML.
pub fn parse_home(content: &str, home_url: Url) -> Result<MindtouchHome, ScraperError> {
    let dom = html_to_dom(content.as_bytes(), "utf-8");
    let document = &dom.document;

    let welcome_image = find_nodes(document, &["div"])
        .iter()
        .filter(|div| has_class(div, "LTBranding"))
        .flat_map(|div| find_nodes(div, &["img"]))
        .chain(find_nodes(document, &["header", "img"]))
        .chain(
            find_nodes(document, &["img"])
                .into_iter()
                .filter(|img| has_class(img, "logo") || has_class(img, "mt-logo")),
        )
        .find_map(|img| get_node_attr(&img, "src").filter(|src| !src.trim().is_empty()))
        .and_then(|src| absolute(&home_url, &src))
        .ok_or_else(|| ScraperError::Parsing("no welcome image found on home page".to_string()))?;

    let links = find_nodes(document, &["link"]);
    let stylesheet = |kind: &str| {
        links
            .iter()
            .filter(|link| rel_values(link).iter().any(|rel| rel == "stylesheet"))
            .filter_map(|link| {
                let href = get_node_attr(link, "href")?;
                let media = get_node_attr(link, "media").unwrap_or_default().to_lowercase();
                (media.contains(kind) || href.to_lowercase().contains(kind)).then_some(href)
            })
            .find_map(|href| absolute(&home_url, &href))
            .ok_or_else(|| ScraperError::Parsing(format!("no {} stylesheet found on home page", kind)))
    };
    let screen_css_url = stylesheet("screen")?;
    let print_css_url = stylesheet("print")?;

    let inline_css = find_nodes(document, &["style"])
        .iter()
        .map(node_text)
        .filter(|css| !css.trim().is_empty())
        .collect();

    let icons_with = |wanted: &dyn Fn(&str) -> bool| -> Vec<String> {
        links
            .iter()
            .filter(|link| {
                get_node_attr(link, "rel").is_some_and(|rel| wanted(&rel))
            })
            .filter_map(|link| get_node_attr(link, "href"))
            .filter_map(|href| absolute(&home_url, &href))
            .collect()
    };
    let mut icons_urls = icons_with(&|rel| rel.trim().eq_ignore_ascii_case("apple-touch-icon"));
    icons_urls.extend(icons_with(&is_favicon));

    let api_token = find_nodes(document, &["script"])
        .iter()
        .find(|script| get_node_attr(script, "id").as_deref() == Some(GLOBAL_SETTINGS_ID))
        .map(node_text)
        .ok_or_else(|| {
            ScraperError::Parsing(format!(
                "failed to retrieve API token, missing {} script",
                GLOBAL_SETTINGS_ID
            ))
        })
        .and_then(|settings| {
            let settings: Value = serde_json::from_str(&settings)?;
            settings
                .get("apiToken")
                .and_then(Value::as_str)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    ScraperError::Parsing("failed to retrieve API token, missing apiToken".to_string())
                })
        })?;

    Ok(MindtouchHome {
        home_url,
        welcome_image_url: welcome_image,
        screen_css_url,
        print_css_url,
        inline_css,
        icons_urls,
        api_token,
    })
}

fn string_field(node: &Value, field: &str) -> Option<String> {
    match node.get(field)? {
        Value::String(value) => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        Value::Object(object) => object.get("#text").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn page_from_node(node: &Value) -> Result<Page, TreeError> {
    let id = string_field(node, "@id")
        .ok_or_else(|| TreeError::Malformed(format!("page without @id: {}", node)))?;
    let title = string_field(node, "title").unwrap_or_default();
    let path = string_field(node, "path").unwrap_or_default();
    Ok(Page::new(id, title, path))
}

/// Child nodes of a tree node: `subpages` is an empty string, a single
/// `page` object or a list of them.
fn subpage_nodes(node: &Value) -> Vec<&Value> {
    match node.get("subpages").and_then(|subpages| subpages.get("page")) {
        Some(Value::Array(pages)) => pages.iter().collect(),
        Some(page @ Value::Object(_)) => vec![page],
        _ => vec![],
    }
}

fn add_subpages(tree: &mut PageTree, parent_id: &str, node: &Value) -> Result<(), TreeError> {
    for child in subpage_nodes(node) {
        let page = page_from_node(child)?;
        let id = page.id.clone();
        tree.add_child(parent_id, page)?;
        add_subpages(tree, &id, child)?;
    }
    Ok(())
}

/// Builds the page tree from the `pages/home/tree` API response.
pub fn parse_page_tree(document: &Value) -> Result<PageTree, TreeError> {
    let root = document
        .get("page")
        .ok_or_else(|| TreeError::Malformed("missing root page".to_string()))?;

    let mut tree = PageTree::new(page_from_node(root)?);
    let root_id = tree.root().id.clone();
    add_subpages(&mut tree, &root_id, root)?;
    Ok(tree)
}

/// HTML body of a `pages/<id>/contents` API response.
pub fn parse_page_body(document: &Value) -> Option<String> {
    match document.get("body")? {
        Value::String(body) => Some(body.clone()),
        Value::Array(parts) => parts.iter().find_map(|part| part.as_str().map(str::to_string)),
        _ => None,
    }
}
