//! `srcset` parsing and best-candidate selection
//!
//! ```rust
//! use mindtouch2zim::parsers::html::parser::{best_srcset_candidate, parse_srcset};
//!
//! let items = parse_srcset("small.jpg 480w, large.jpg 800w");
//! assert_eq!(items.len(), 2);
//! assert_eq!(best_srcset_candidate("small.jpg 480w, large.jpg 800w"), Some("large.jpg"));
//! ```

use super::utils::WHITESPACES;

/// One candidate of a `srcset` attribute.
#[derive(Debug, PartialEq, Eq)]
pub struct SrcSetItem<'a> {
    pub path: &'a str,
    /// Width (`480w`) or density (`2x`) descriptor, empty when absent
    pub descriptor: &'a str,
}

/// Parsed `srcset` descriptor; a missing one means `1x`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SrcSetDescriptor {
    Width(f64),
    Density(f64),
}

impl SrcSetDescriptor {
    pub fn parse(descriptor: &str) -> Option<SrcSetDescriptor> {
        let descriptor = descriptor.trim();
        if descriptor.is_empty() {
            return Some(SrcSetDescriptor::Density(1.0));
        }

        let unit = descriptor.chars().last()?;
        let value: f64 = descriptor[..descriptor.len() - unit.len_utf8()].parse().ok()?;
        match unit {
            'w' | 'W' => Some(SrcSetDescriptor::Width(value)),
            'x' | 'X' => Some(SrcSetDescriptor::Density(value)),
            _ => None,
        }
    }
}

/// Whether `new_descriptor` designates a larger image than
/// `current_best_descriptor`. Descriptors of different kinds, or
/// unparsable ones, never win.
pub fn is_better_srcset_descriptor(new_descriptor: &str, current_best_descriptor: &str) -> bool {
    match (
        SrcSetDescriptor::parse(new_descriptor),
        SrcSetDescriptor::parse(current_best_descriptor),
    ) {
        (Some(SrcSetDescriptor::Width(new)), Some(SrcSetDescriptor::Width(best))) => new > best,
        (Some(SrcSetDescriptor::Density(new)), Some(SrcSetDescriptor::Density(best))) => {
            new > best
        }
        _ => false,
    }
}

/// URL of the largest candidate of a `srcset`, first one on ties.
pub fn best_srcset_candidate(srcset: &str) -> Option<&str> {
    let mut best: Option<SrcSetItem> = None;

    for item in parse_srcset(srcset) {
        let replace = match &best {
            None => true,
            Some(current) => is_better_srcset_descriptor(item.descriptor, current.descriptor),
        };
        if replace {
            best = Some(item);
        }
    }

    best.map(|item| item.path)
}

pub fn parse_srcset(srcset: &str) -> Vec<SrcSetItem> {
    let mut srcset_items: Vec<SrcSetItem> = vec![];

    let mut partials: Vec<&str> = srcset.split(WHITESPACES).collect();
    let mut path: Option<&str> = None;
    let mut descriptor: Option<&str> = None;
    let mut i = 0;

    while i < partials.len() {
        let partial = partials[i];
        i += 1;

        if partial.is_empty() {
            continue;
        }

        if let Some(stripped) = partial.strip_suffix(',') {
            // End of a candidate
            if path.is_none() {
                path = Some(stripped);
                descriptor = Some("");
            } else {
                descriptor = Some(stripped);
            }
        } else if path.is_none() {
            path = Some(partial);
        } else {
            // Descriptor glued to the next candidate ("2x,next.png")
            match partial.split_once(',') {
                Some((first, rest)) if first.ends_with(['x', 'w']) => {
                    descriptor = Some(first);
                    if !rest.is_empty() {
                        partials.insert(i, rest);
                    }
                }
                _ => descriptor = Some(partial),
            }
        }

        if let (Some(p), Some(d)) = (path, descriptor) {
            srcset_items.push(SrcSetItem {
                path: p,
                descriptor: d,
            });

            path = None;
            descriptor = None;
        }
    }

    if let Some(p) = path {
        srcset_items.push(SrcSetItem {
            path: p,
            descriptor: descriptor.unwrap_or_default(),
        });
    }

    srcset_items
}
