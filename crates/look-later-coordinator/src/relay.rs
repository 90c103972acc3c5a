use crate::channel::NotificationSender;
use crate::error::Result;
use crate::message::Notification;
use look_later_core::{Clock, LinkRecord, MonotonicStamper, SystemClock};
use tracing::{debug, trace};

/// The slice of a page element the capture relay needs.
pub trait DomNode {
    /// Upper-case element name, e.g. `A` or `SPAN`.
    fn tag_name(&self) -> &str;
    fn parent(&self) -> Option<&Self>;
    /// Resolved absolute href, for elements that carry one.
    fn href(&self) -> Option<&str>;
    fn inner_text(&self) -> &str;
}

/// Returns the nearest `A` element at or above `target`.
///
/// The walk stops without a match at `BODY` or at the top of the tree.
pub fn find_enclosing_anchor<N: DomNode>(target: &N) -> Option<&N> {
    let mut node = Some(target);
    while let Some(current) = node {
        let tag = current.tag_name();
        if tag.eq_ignore_ascii_case("a") {
            return Some(current);
        }
        if tag.eq_ignore_ascii_case("body") {
            return None;
        }
        node = current.parent();
    }
    None
}

/// Where the right-click happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    pub host: String,
    pub path: String,
}

impl PageLocation {
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
        }
    }

    /// `host + path`, the form stored as a record's origin.
    pub fn origin(&self) -> String {
        format!("{}{}", self.host, self.path)
    }
}

/// Page-side half of a capture: turns a context-menu target into a `link`
/// notification for the coordinator.
pub struct CaptureRelay<C: Clock = SystemClock> {
    sender: NotificationSender,
    stamper: MonotonicStamper<C>,
}

impl CaptureRelay<SystemClock> {
    pub fn new(sender: NotificationSender) -> Self {
        Self::with_stamper(sender, MonotonicStamper::new())
    }
}

impl<C: Clock> CaptureRelay<C> {
    pub fn with_stamper(sender: NotificationSender, stamper: MonotonicStamper<C>) -> Self {
        Self { sender, stamper }
    }

    /// Handles a context-menu event on `target`.
    ///
    /// Sends exactly one notification when the target sits inside a link and
    /// returns the record sent; otherwise sends nothing.
    pub fn on_context_menu<N: DomNode>(
        &self,
        target: &N,
        page: &PageLocation,
    ) -> Result<Option<LinkRecord>> {
        let Some(anchor) = find_enclosing_anchor(target) else {
            trace!(tag = target.tag_name(), "context menu outside any link");
            return Ok(None);
        };
        let Some(href) = anchor.href() else {
            trace!("enclosing anchor has no href");
            return Ok(None);
        };

        let record = LinkRecord::new(
            self.stamper.next_stamp(),
            href,
            target.inner_text(),
            page.origin(),
        );
        debug!(key = %record.key(), href = %record.href, "relaying capture");
        self.sender.notify(Notification::Link(record.clone()))?;
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::notification_channel;
    use crate::error::CoordinatorError;
    use jiff::Timestamp;
    use look_later_core::ManualClock;

    /// An element that owns its ancestor chain.
    struct Node {
        tag: &'static str,
        href: Option<&'static str>,
        text: &'static str,
        parent: Option<Box<Node>>,
    }

    impl Node {
        fn new(tag: &'static str) -> Self {
            Self {
                tag,
                href: None,
                text: "",
                parent: None,
            }
        }

        fn with_href(mut self, href: &'static str) -> Self {
            self.href = Some(href);
            self
        }

        fn with_text(mut self, text: &'static str) -> Self {
            self.text = text;
            self
        }

        fn inside(mut self, parent: Node) -> Self {
            self.parent = Some(Box::new(parent));
            self
        }
    }

    impl DomNode for Node {
        fn tag_name(&self) -> &str {
            self.tag
        }

        fn parent(&self) -> Option<&Self> {
            self.parent.as_deref()
        }

        fn href(&self) -> Option<&str> {
            self.href
        }

        fn inner_text(&self) -> &str {
            self.text
        }
    }

    fn page() -> PageLocation {
        PageLocation::new("example.org", "/articles/1")
    }

    fn relay() -> (CaptureRelay<ManualClock>, crate::channel::NotificationReceiver) {
        let (sender, receiver) = notification_channel();
        let clock = ManualClock::new(Timestamp::from_millisecond(1_594_570_000_123).unwrap());
        (
            CaptureRelay::with_stamper(sender, MonotonicStamper::with_clock(clock)),
            receiver,
        )
    }

    #[test]
    fn anchor_found_through_nested_elements() {
        let body = Node::new("BODY");
        let anchor = Node::new("A").with_href("https://rust-lang.org/").inside(body);
        let target = Node::new("SPAN").inside(Node::new("EM").inside(anchor));

        let found = find_enclosing_anchor(&target).unwrap();
        assert_eq!(found.href(), Some("https://rust-lang.org/"));
    }

    #[test]
    fn target_itself_can_be_the_anchor() {
        let target = Node::new("a").with_href("https://a.example/");
        assert!(find_enclosing_anchor(&target).is_some());
    }

    #[test]
    fn walk_stops_at_body() {
        let outer = Node::new("A").with_href("https://never.example/");
        let target = Node::new("P").inside(Node::new("BODY").inside(outer));

        assert!(find_enclosing_anchor(&target).is_none());
    }

    #[test]
    fn walk_stops_at_root() {
        let target = Node::new("DIV").inside(Node::new("HTML"));
        assert!(find_enclosing_anchor(&target).is_none());
    }

    #[test]
    fn capture_inside_link_sends_one_notification() {
        let (relay, mut receiver) = relay();
        let target = Node::new("SPAN")
            .with_text("The Book")
            .inside(Node::new("A").with_href("https://doc.rust-lang.org/book/").with_text("The Book"));

        let sent = relay.on_context_menu(&target, &page()).unwrap().unwrap();

        assert_eq!(
            sent,
            LinkRecord::new(
                1_594_570_000_123,
                "https://doc.rust-lang.org/book/",
                "The Book",
                "example.org/articles/1",
            )
        );
        assert_eq!(receiver.try_recv().unwrap(), Notification::Link(sent));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn capture_outside_link_sends_nothing() {
        let (relay, mut receiver) = relay();
        let target = Node::new("P").with_text("plain").inside(Node::new("BODY"));

        assert_eq!(relay.on_context_menu(&target, &page()).unwrap(), None);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn same_millisecond_captures_get_distinct_keys() {
        let (relay, _receiver) = relay();
        let target = Node::new("A").with_href("https://a.example/");

        let first = relay.on_context_menu(&target, &page()).unwrap().unwrap();
        let second = relay.on_context_menu(&target, &page()).unwrap().unwrap();

        assert_ne!(first.key(), second.key());
    }

    #[test]
    fn closed_channel_surfaces_error() {
        let (relay, receiver) = relay();
        drop(receiver);
        let target = Node::new("A").with_href("https://a.example/");

        let err = relay.on_context_menu(&target, &page()).unwrap_err();
        assert!(matches!(err, CoordinatorError::Channel(_)));
    }
}
