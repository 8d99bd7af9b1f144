use std::collections::HashSet;

use crate::models::Link;

/// The signed-in user's links as held by the dashboard
///
/// The backend has no delete operation. `hide_locally` removes a link
/// from what this dashboard shows and nothing else: the link keeps
/// redirecting and reappears for any other client. Hidden codes survive
/// a refresh from the backend and are forgotten on `clear`.
#[derive(Debug, Default)]
pub struct LinkList {
    links: Vec<Link>,
    hidden: HashSet<String>,
}

impl LinkList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held links with a fresh backend listing
    pub fn replace(&mut self, links: Vec<Link>) {
        self.links = links;
    }

    /// Put a newly created link at the top
    pub fn prepend(&mut self, link: Link) {
        self.hidden.remove(&link.short);
        self.links.retain(|l| l.short != link.short);
        self.links.insert(0, link);
    }

    /// Hide a link from this dashboard without touching the backend
    ///
    /// Returns false if no visible link has that short code.
    pub fn hide_locally(&mut self, short_code: &str) -> bool {
        let known = self.links.iter().any(|l| l.short == short_code);
        known && self.hidden.insert(short_code.to_string())
    }

    pub fn visible(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(|l| !self.hidden.contains(&l.short))
    }

    pub fn get(&self, short_code: &str) -> Option<&Link> {
        self.visible().find(|l| l.short == short_code)
    }

    pub fn hidden_count(&self) -> usize {
        self.links
            .iter()
            .filter(|l| self.hidden.contains(&l.short))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.visible().next().is_none()
    }

    pub fn clear(&mut self) {
        self.links.clear();
        self.hidden.clear();
    }
}
