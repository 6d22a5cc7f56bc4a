//! Change notifications for a watched path
//!
//! Normalizes the native watcher's event vocabulary down to the four
//! kinds the tailing engine cares about, plus a neutral `Trigger` kind
//! for externally supplied trigger streams.

use std::path::PathBuf;

use notify::event::{EventKind, ModifyKind, RenameMode};

/// Category of a file-change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A file appeared at the watched path.
    Created,
    /// The watched file's content (or metadata) changed.
    Modified,
    /// The watched file was deleted or renamed away.
    Removed,
    /// The native mechanism dropped detail due to event volume.
    Overflow,
    /// A neutral trigger from an external source (timer, channel, ...).
    ///
    /// Carries no file-specific semantics: it prompts a length check
    /// and catch-up read, nothing more.
    Trigger,
}

/// A single change notification, produced once per native signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// Paths the native watcher associated with the event. Empty for
    /// `Overflow` and for externally supplied triggers.
    pub paths: Vec<PathBuf>,
}

impl ChangeEvent {
    /// A neutral trigger value for externally driven tailing.
    pub fn trigger() -> Self {
        Self {
            kind: ChangeKind::Trigger,
            paths: Vec::new(),
        }
    }

    pub(crate) fn new(kind: ChangeKind, paths: Vec<PathBuf>) -> Self {
        Self { kind, paths }
    }

    /// Translate a native event, or `None` if it is of no interest
    /// (pure access events, for example).
    ///
    /// Rename-away is reported as `Removed` and rename-into as
    /// `Created` so that log rotation surfaces as a delete/create
    /// pair, matching the watch-service semantics the engine assumes.
    pub(crate) fn from_native(event: &notify::Event) -> Option<Self> {
        if event.need_rescan() {
            return Some(Self::new(ChangeKind::Overflow, Vec::new()));
        }
        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => ChangeKind::Removed,
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ChangeKind::Created,
            EventKind::Modify(_) => ChangeKind::Modified,
            // Unclassified events still warrant a catch-up check.
            EventKind::Any | EventKind::Other => ChangeKind::Modified,
            EventKind::Access(_) => return None,
        };
        Some(Self::new(kind, event.paths.clone()))
    }

    /// Burst-class events may be debounced; everything else must pass
    /// through without delay.
    pub(crate) fn is_burst_class(&self) -> bool {
        matches!(self.kind, ChangeKind::Modified | ChangeKind::Overflow)
    }
}

/// The set of notification kinds a watch session is interested in.
///
/// Defaults to all four; external triggers are never filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventKinds {
    pub created: bool,
    pub modified: bool,
    pub removed: bool,
    pub overflow: bool,
}

impl EventKinds {
    pub fn all() -> Self {
        Self {
            created: true,
            modified: true,
            removed: true,
            overflow: true,
        }
    }

    pub fn none() -> Self {
        Self {
            created: false,
            modified: false,
            removed: false,
            overflow: false,
        }
    }

    pub(crate) fn contains(&self, kind: ChangeKind) -> bool {
        match kind {
            ChangeKind::Created => self.created,
            ChangeKind::Modified => self.modified,
            ChangeKind::Removed => self.removed,
            ChangeKind::Overflow => self.overflow,
            ChangeKind::Trigger => true,
        }
    }
}

impl Default for EventKinds {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};

    fn native(kind: EventKind) -> notify::Event {
        notify::Event::new(kind).add_path(PathBuf::from("/tmp/x.log"))
    }

    #[test]
    fn classifies_create_modify_remove() {
        let ev = ChangeEvent::from_native(&native(EventKind::Create(CreateKind::File))).unwrap();
        assert_eq!(ev.kind, ChangeKind::Created);

        let ev =
            ChangeEvent::from_native(&native(EventKind::Modify(ModifyKind::Data(DataChange::Any))))
                .unwrap();
        assert_eq!(ev.kind, ChangeKind::Modified);

        let ev = ChangeEvent::from_native(&native(EventKind::Remove(RemoveKind::File))).unwrap();
        assert_eq!(ev.kind, ChangeKind::Removed);
    }

    #[test]
    fn rename_maps_to_remove_and_create() {
        let from = native(EventKind::Modify(ModifyKind::Name(RenameMode::From)));
        assert_eq!(
            ChangeEvent::from_native(&from).unwrap().kind,
            ChangeKind::Removed
        );

        let to = native(EventKind::Modify(ModifyKind::Name(RenameMode::To)));
        assert_eq!(
            ChangeEvent::from_native(&to).unwrap().kind,
            ChangeKind::Created
        );
    }

    #[test]
    fn rescan_flag_becomes_overflow() {
        let ev = notify::Event::new(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)))
            .set_flag(notify::event::Flag::Rescan);
        let ev = ChangeEvent::from_native(&ev).unwrap();
        assert_eq!(ev.kind, ChangeKind::Overflow);
        assert!(ev.paths.is_empty());
    }

    #[test]
    fn access_events_are_ignored() {
        let ev = native(EventKind::Access(notify::event::AccessKind::Any));
        assert!(ChangeEvent::from_native(&ev).is_none());
    }

    #[test]
    fn burst_classification() {
        assert!(ChangeEvent::new(ChangeKind::Modified, vec![]).is_burst_class());
        assert!(ChangeEvent::new(ChangeKind::Overflow, vec![]).is_burst_class());
        assert!(!ChangeEvent::new(ChangeKind::Created, vec![]).is_burst_class());
        assert!(!ChangeEvent::new(ChangeKind::Removed, vec![]).is_burst_class());
        assert!(!ChangeEvent::trigger().is_burst_class());
    }

    #[test]
    fn kind_filter_never_drops_external_triggers() {
        let none = EventKinds::none();
        assert!(none.contains(ChangeKind::Trigger));
        assert!(!none.contains(ChangeKind::Modified));
        assert!(EventKinds::all().contains(ChangeKind::Overflow));
    }
}
