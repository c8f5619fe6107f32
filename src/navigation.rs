use serde::Serialize;

/// Pages reachable from the top bar, in display order.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Page {
    Release,
    Journal,
    Wisdom,
    Chat,
    Settings,
}

impl Default for Page {
    fn default() -> Self {
        Page::Release
    }
}

impl Page {
    pub const ALL: [Page; 5] = [
        Page::Release,
        Page::Journal,
        Page::Wisdom,
        Page::Chat,
        Page::Settings,
    ];

    pub fn file(&self) -> &'static str {
        match self {
            Page::Release => "index.html",
            Page::Journal => "journal.html",
            Page::Wisdom => "wisdom.html",
            Page::Chat => "chat.html",
            Page::Settings => "settings.html",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Page::Release => "释放",
            Page::Journal => "日记",
            Page::Wisdom => "智慧",
            Page::Chat => "对话",
            Page::Settings => "设置",
        }
    }

    /// Page for a location path. Only the last segment counts; an empty one
    /// means the index page. Unknown files match nothing.
    pub fn from_path(path: &str) -> Option<Page> {
        let file = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .rsplit('/')
            .next()
            .unwrap_or_default();
        let file = if file.is_empty() { Page::Release.file() } else { file };
        Page::ALL.into_iter().find(|page| page.file() == file)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NavLink {
    pub page: Page,
    pub href: &'static str,
    pub label: &'static str,
    pub active: bool,
}

/// Top-bar links for the page at `path`, with at most one marked active.
pub fn nav_links(path: &str) -> Vec<NavLink> {
    let current = Page::from_path(path);
    Page::ALL
        .into_iter()
        .map(|page| NavLink {
            page,
            href: page.file(),
            label: page.label(),
            active: current == Some(page),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_is_the_index_page() {
        assert_eq!(Page::from_path(""), Some(Page::Release));
        assert_eq!(Page::from_path("/"), Some(Page::Release));
        assert_eq!(Page::from_path("/app/"), Some(Page::Release));
    }

    #[test]
    fn last_segment_decides() {
        assert_eq!(Page::from_path("/app/journal.html"), Some(Page::Journal));
        assert_eq!(Page::from_path("settings.html?tab=music"), Some(Page::Settings));
        assert_eq!(Page::from_path("/x/about.html"), None);
    }

    #[test]
    fn exactly_one_link_is_active() {
        let links = nav_links("/wisdom.html");
        assert_eq!(links.len(), 5);
        let active: Vec<_> = links.iter().filter(|l| l.active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].label, "智慧");
        assert_eq!(links[0].href, "index.html");
    }

    #[test]
    fn unknown_page_highlights_nothing() {
        assert!(nav_links("/missing.html").iter().all(|l| !l.active));
    }
}
