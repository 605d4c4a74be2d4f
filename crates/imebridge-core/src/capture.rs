use std::cell::Cell;
use std::rc::Rc;

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct CaptureKinds: u8 {
        const AUDIO   = 1 << 0;
        const VIDEO   = 1 << 1;
        const WINDOW  = 1 << 2;
        const DISPLAY = 1 << 3;
    }
}

/// Service that wants to hear about media capture state.
pub trait CaptureStateSink {
    fn capture_state_changed(&self, kind: CaptureKinds, capturing: bool);
}

/// Forwards capture-state changes to the sink it was built with.
/// The first notification of each kind always reaches the sink; after that,
/// repeats with an unchanged state are swallowed.
pub struct MediaCaptureObserver {
    sink: Rc<dyn CaptureStateSink>,
    active: Cell<CaptureKinds>,
    seen: Cell<CaptureKinds>,
}

impl MediaCaptureObserver {
    pub fn new(sink: Rc<dyn CaptureStateSink>) -> Self {
        Self {
            sink,
            active: Cell::new(CaptureKinds::empty()),
            seen: Cell::new(CaptureKinds::empty()),
        }
    }

    pub fn on_is_capturing_audio_changed(&self, capturing: bool) {
        self.update(CaptureKinds::AUDIO, capturing);
    }

    pub fn on_is_capturing_video_changed(&self, capturing: bool) {
        self.update(CaptureKinds::VIDEO, capturing);
    }

    pub fn on_is_capturing_window_changed(&self, capturing: bool) {
        self.update(CaptureKinds::WINDOW, capturing);
    }

    pub fn on_is_capturing_display_changed(&self, capturing: bool) {
        self.update(CaptureKinds::DISPLAY, capturing);
    }

    pub fn active(&self) -> CaptureKinds {
        self.active.get()
    }

    fn update(&self, kind: CaptureKinds, capturing: bool) {
        let mut active = self.active.get();
        let seen = self.seen.get();
        if seen.contains(kind) && active.contains(kind) == capturing {
            return;
        }
        self.seen.set(seen | kind);
        active.set(kind, capturing);
        self.active.set(active);
        log::debug!("capture {kind:?} -> {capturing}");
        self.sink.capture_state_changed(kind, capturing);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<(CaptureKinds, bool)>>);

    impl CaptureStateSink for Recorder {
        fn capture_state_changed(&self, kind: CaptureKinds, capturing: bool) {
            self.0.borrow_mut().push((kind, capturing));
        }
    }

    #[test]
    fn test_forwards_to_injected_sink() {
        let sink = Rc::new(Recorder::default());
        let obs = MediaCaptureObserver::new(sink.clone());

        obs.on_is_capturing_audio_changed(true);
        obs.on_is_capturing_video_changed(true);
        obs.on_is_capturing_audio_changed(true); // unchanged
        obs.on_is_capturing_display_changed(false); // first for display
        obs.on_is_capturing_display_changed(false); // unchanged
        obs.on_is_capturing_audio_changed(false);
        obs.on_is_capturing_window_changed(true);

        assert_eq!(
            *sink.0.borrow(),
            vec![
                (CaptureKinds::AUDIO, true),
                (CaptureKinds::VIDEO, true),
                (CaptureKinds::DISPLAY, false),
                (CaptureKinds::AUDIO, false),
                (CaptureKinds::WINDOW, true),
            ]
        );
        assert_eq!(obs.active(), CaptureKinds::VIDEO | CaptureKinds::WINDOW);
    }

    #[test]
    fn test_initial_false_reaches_sink() {
        let sink = Rc::new(Recorder::default());
        let obs = MediaCaptureObserver::new(sink.clone());

        obs.on_is_capturing_audio_changed(false);
        obs.on_is_capturing_video_changed(false);
        obs.on_is_capturing_audio_changed(false);

        assert_eq!(
            *sink.0.borrow(),
            vec![(CaptureKinds::AUDIO, false), (CaptureKinds::VIDEO, false)]
        );
        assert!(obs.active().is_empty());
    }
}
