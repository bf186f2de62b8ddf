use capture::CaptureState;
use lens::LensParameters;
use winit::keyboard::{Key, NamedKey};

/// Things the user can ask for from the keyboard or mouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    CurvatureUp,
    CurvatureDown,
    ZoomIn,
    ZoomOut,
    Reset,
    Capture,
    ToggleFacing,
    /// Close the preview if one is open, otherwise quit.
    Dismiss,
}

pub(crate) fn action_for_key(key: &Key) -> Option<Action> {
    match key {
        Key::Named(NamedKey::ArrowUp) => Some(Action::CurvatureUp),
        Key::Named(NamedKey::ArrowDown) => Some(Action::CurvatureDown),
        Key::Named(NamedKey::ArrowRight) => Some(Action::ZoomIn),
        Key::Named(NamedKey::ArrowLeft) => Some(Action::ZoomOut),
        Key::Named(NamedKey::Space) | Key::Named(NamedKey::Enter) => Some(Action::Capture),
        Key::Named(NamedKey::Escape) => Some(Action::Dismiss),
        Key::Character(value) => match value.as_str() {
            " " => Some(Action::Capture),
            "r" | "R" => Some(Action::Reset),
            "f" | "F" => Some(Action::ToggleFacing),
            _ => None,
        },
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EscapeResponse {
    /// A preview is open or still being decoded; Escape belongs to it.
    ClosePreview,
    Quit,
}

pub(crate) fn escape_response(state: CaptureState) -> EscapeResponse {
    match state {
        CaptureState::PreviewOpen => EscapeResponse::ClosePreview,
        _ => EscapeResponse::Quit,
    }
}

/// Curvature/zoom as edited by the user, plus where a reset returns to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Controls {
    params: LensParameters,
    initial: LensParameters,
    step: f32,
}

impl Controls {
    pub fn new(initial: LensParameters, step: f32) -> Self {
        Self {
            params: initial,
            initial,
            step,
        }
    }

    pub fn params(&self) -> LensParameters {
        self.params
    }

    /// Applies a lens action. Returns whether the parameters changed; other
    /// actions are left to the caller and report `false`.
    pub fn apply(&mut self, action: Action) -> bool {
        let before = self.params;
        match action {
            Action::CurvatureUp => self.params.nudge_curvature(self.step),
            Action::CurvatureDown => self.params.nudge_curvature(-self.step),
            Action::ZoomIn => self.params.nudge_zoom(self.step),
            Action::ZoomOut => self.params.nudge_zoom(-self.step),
            Action::Reset => self.params = self.initial,
            Action::Capture | Action::ToggleFacing | Action::Dismiss => return false,
        }
        self.params != before
    }

    pub fn title(&self, base: &str) -> String {
        let (curvature, zoom) = self.params.percent_labels();
        format!("{base} | curvature {curvature}% | zoom {zoom}%")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_never_quits_while_a_preview_is_pending() {
        assert_eq!(
            escape_response(CaptureState::PreviewOpen),
            EscapeResponse::ClosePreview
        );
        assert_eq!(escape_response(CaptureState::Idle), EscapeResponse::Quit);
        assert_eq!(escape_response(CaptureState::Encoding), EscapeResponse::Quit);
    }

    #[test]
    fn arrows_and_letters_map_to_actions() {
        assert_eq!(
            action_for_key(&Key::Named(NamedKey::ArrowUp)),
            Some(Action::CurvatureUp)
        );
        assert_eq!(
            action_for_key(&Key::Named(NamedKey::ArrowLeft)),
            Some(Action::ZoomOut)
        );
        assert_eq!(
            action_for_key(&Key::Named(NamedKey::Enter)),
            Some(Action::Capture)
        );
        assert_eq!(
            action_for_key(&Key::Character("R".into())),
            Some(Action::Reset)
        );
        assert_eq!(
            action_for_key(&Key::Character("f".into())),
            Some(Action::ToggleFacing)
        );
        assert_eq!(action_for_key(&Key::Character("x".into())), None);
    }

    #[test]
    fn steps_clamp_at_the_curvature_limits() {
        let mut controls = Controls::new(LensParameters::new(0.98, 1.0), 0.05);
        assert!(controls.apply(Action::CurvatureUp));
        assert_eq!(controls.params().curvature(), 1.0);
        assert!(!controls.apply(Action::CurvatureUp));
    }

    #[test]
    fn reset_returns_to_the_initial_parameters() {
        let initial = LensParameters::new(0.3, 1.2);
        let mut controls = Controls::new(initial, 0.05);
        controls.apply(Action::ZoomIn);
        controls.apply(Action::CurvatureDown);
        assert_ne!(controls.params(), initial);
        assert!(controls.apply(Action::Reset));
        assert_eq!(controls.params(), initial);
        assert!(!controls.apply(Action::Capture));
    }

    #[test]
    fn title_shows_percentages() {
        let controls = Controls::new(LensParameters::new(0.5, 1.25), 0.05);
        assert_eq!(
            controls.title("Convex Cam"),
            "Convex Cam | curvature 50% | zoom 125%"
        );
    }
}
