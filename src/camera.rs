//! Map camera state, the constraint that keeps it over the data, and top-down framing.

use log::debug;

use crate::bounding_box::BoundingBox;
use crate::error::PipelineError;
use crate::projection::ProjectedPoint;


/// Safety factor applied to the framing distance so box edges don't touch the viewport border.
pub const FRAMING_MARGIN: f64 = 1.1;

/// Extra inner margin on the lower y bound of the camera position.
pub const LOWER_Y_MARGIN: f64 = 0.25;

/// Distance moved by one pan key press.
pub const PAN_STEP: f64 = 0.05;

/// Up vector of the free camera (z points out of the map plane).
pub const Z_UP: ProjectedPoint = ProjectedPoint { x: 0.0, y: 0.0, z: 1.0 };

/// Up vector of the locked top-down camera (north is up on screen).
pub const NORTH_UP: ProjectedPoint = ProjectedPoint { x: 0.0, y: 1.0, z: 0.0 };


/// Everything about the camera that interaction code reads or writes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CameraView {
    pub position: ProjectedPoint,
    /// The point the camera looks at.
    pub target: ProjectedPoint,
    pub up: ProjectedPoint,
    /// Vertical field of view in degrees.
    pub fov: f64,
    pub enable_rotate: bool,
    pub enable_pan: bool,
    /// Largest allowed distance between position and target.
    pub max_distance: f64,
}

impl Default for CameraView {
    fn default() -> Self {
        CameraView {
            position: ProjectedPoint::new(0.0, 0.0, 20.0),
            target: ProjectedPoint::new(0.0, 0.0, 0.0),
            up: Z_UP,
            fov: 75.0,
            enable_rotate: false,
            enable_pan: true,
            max_distance: std::f64::INFINITY,
        }
    }
}

pub type ChangeListener = Box<dyn FnMut(&mut CameraView)>;

/// A camera with pan/zoom controls that notifies listeners after every change.
pub trait Controls {
    fn view(&self) -> &CameraView;

    /// Apply a change to the view and notify all listeners.
    fn update(&mut self, change: &mut dyn FnMut(&mut CameraView));

    fn add_change_listener(&mut self, listener: ChangeListener);
}


/// Controls for a map-like camera.
pub struct MapControls {
    view: CameraView,
    listeners: Vec<ChangeListener>,
}

impl MapControls {
    pub fn new(view: CameraView) -> Self {
        MapControls {
            view,
            listeners: vec![],
        }
    }

    /// Pull the camera towards its target if it got further away than `max_distance`.
    fn limit_distance(view: &mut CameraView) {
        let dist = view.position.distance_to(&view.target);
        if dist > view.max_distance && dist > 0.0 {
            let f = view.max_distance / dist;
            view.position = ProjectedPoint::new(
                view.target.x + (view.position.x - view.target.x) * f,
                view.target.y + (view.position.y - view.target.y) * f,
                view.target.z + (view.position.z - view.target.z) * f,
            );
        }
    }
}

impl Controls for MapControls {
    fn view(&self) -> &CameraView {
        &self.view
    }

    fn update(&mut self, change: &mut dyn FnMut(&mut CameraView)) {
        change(&mut self.view);
        Self::limit_distance(&mut self.view);
        for listener in self.listeners.iter_mut() {
            listener(&mut self.view);
        }
    }

    fn add_change_listener(&mut self, listener: ChangeListener) {
        self.listeners.push(listener);
    }
}


fn clamp(value: f64, min: f64, max: f64) -> f64 {
    min.max(max.min(value))
}

/// Keeps camera position and target within a bounding box.
#[derive(Copy, Clone, Debug)]
pub struct CameraConstraint {
    bounds: BoundingBox,
}

impl CameraConstraint {
    pub fn new(bounds: BoundingBox) -> Self {
        CameraConstraint { bounds }
    }

    pub fn apply(&self, view: &mut CameraView) {
        let b = &self.bounds;
        view.position.x = clamp(view.position.x, b.min.x, b.max.x);
        view.position.y = clamp(view.position.y, b.min.y + LOWER_Y_MARGIN, b.max.y);
        view.position.z = clamp(view.position.z, b.min.z, b.max.z);

        view.target.x = clamp(view.target.x, b.min.x, b.max.x);
        view.target.y = clamp(view.target.y, b.min.y, b.max.y);
        view.target.z = clamp(view.target.z, b.min.z, b.max.z);
    }

    /// Register the constraint so it runs after every camera change.
    pub fn install<C: Controls + ?Sized>(self, controls: &mut C) {
        controls.add_change_listener(Box::new(move |view: &mut CameraView| self.apply(view)));
    }
}


/// Accept a field of view strictly between 0° and 180°.
pub fn check_fov(fov_degrees: f64) -> Result<f64, PipelineError> {
    if fov_degrees > 0.0 && fov_degrees < 180.0 {
        Ok(fov_degrees)
    } else {
        Err(PipelineError::InvalidFieldOfView(fov_degrees))
    }
}

/// Camera distance at which a field of view of `fov_degrees` shows the larger side of the box.
pub fn framing_distance(bounds: &BoundingBox, fov_degrees: f64) -> Result<f64, PipelineError> {
    let fov = check_fov(fov_degrees)?.to_radians();
    Ok((bounds.max_dimension() / 2.0 / (fov / 2.0).tan()).abs() * FRAMING_MARGIN)
}

/// Field of view for a viewport width: 90° up to 600 px, 60° from 1200 px, linear in between.
pub fn fov_for_viewport_width(width: f64) -> f64 {
    let (min_width, max_width) = (600.0, 1200.0);
    let (wide_fov, narrow_fov) = (90.0, 60.0);
    let scale = clamp((width - min_width) / (max_width - min_width), 0.0, 1.0);
    wide_fov + (narrow_fov - wide_fov) * scale
}

/// Center the camera above the box at framing distance, then keep it inside the box from now on.
pub fn frame_and_constrain<C: Controls + ?Sized>(controls: &mut C, bounds: BoundingBox)
    -> Result<(), PipelineError>
{
    let center = bounds.center();
    let distance = framing_distance(&bounds, controls.view().fov)?;
    debug!("Initial camera distance {:.4} above ({:.4}, {:.4})", distance, center.x, center.y);

    controls.update(&mut |view| {
        view.position = ProjectedPoint::new(center.x, center.y, distance);
        view.target = center;
    });
    CameraConstraint::new(bounds).install(controls);
    controls.update(&mut |_| {});
    Ok(())
}


#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LockState {
    Free,
    Locked,
}

/// Toggles between a free camera and one that looks straight down on the whole box.
#[derive(Copy, Clone, Debug)]
pub struct TopDownLock {
    state: LockState,
    snapshot: Option<BoundingBox>,
}

impl Default for TopDownLock {
    fn default() -> Self {
        TopDownLock {
            state: LockState::Free,
            snapshot: None,
        }
    }
}

impl TopDownLock {
    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == LockState::Locked
    }

    /// The bounding box captured when the lock was engaged.
    pub fn snapshot(&self) -> Option<BoundingBox> {
        self.snapshot
    }

    /// Enter the requested state. Requesting the current state does nothing.
    pub fn set<C: Controls + ?Sized>(
        &mut self,
        locked: bool,
        bounds: Option<&BoundingBox>,
        controls: &mut C,
    ) -> Result<(), PipelineError> {
        match (self.state, locked) {
            (LockState::Free, true) => {
                let bounds = *bounds.ok_or(PipelineError::MissingBoundingBox)?;
                let center = bounds.center();
                let distance = framing_distance(&bounds, controls.view().fov)?;
                controls.update(&mut |view| {
                    view.position = ProjectedPoint::new(center.x, center.y, distance);
                    view.target = center;
                    view.up = NORTH_UP;
                    view.enable_rotate = false;
                    view.enable_pan = true;
                });
                self.snapshot = Some(bounds);
                self.state = LockState::Locked;
            },
            (LockState::Locked, false) => {
                controls.update(&mut |view| {
                    view.up = Z_UP;
                    view.enable_rotate = true;
                });
                self.state = LockState::Free;
            },
            _ => {},
        }
        Ok(())
    }

    pub fn toggle<C: Controls + ?Sized>(&mut self, bounds: Option<&BoundingBox>, controls: &mut C)
        -> Result<(), PipelineError>
    {
        let locked = !self.is_locked();
        self.set(locked, bounds, controls)
    }
}


/// Handle a key press. `l` toggles the top-down lock, `w`/`a`/`s`/`d` pan while locked.
/// Returns true if the key was consumed.
pub fn handle_key<C: Controls + ?Sized>(
    key: char,
    lock: &mut TopDownLock,
    bounds: Option<&BoundingBox>,
    controls: &mut C,
) -> Result<bool, PipelineError> {
    let key = key.to_ascii_lowercase();
    if key == 'l' {
        lock.toggle(bounds, controls)?;
        return Ok(true);
    }
    if !lock.is_locked() {
        return Ok(false);
    }

    let (dx, dy) = match key {
        'w' => (0.0, PAN_STEP),
        's' => (0.0, -PAN_STEP),
        'a' => (-PAN_STEP, 0.0),
        'd' => (PAN_STEP, 0.0),
        _ => return Ok(false),
    };
    controls.update(&mut |view| {
        view.position.x += dx;
        view.position.y += dy;
        view.target.x += dx;
        view.target.y += dy;
    });
    Ok(true)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1.0e-10
    }

    fn bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> BoundingBox {
        BoundingBox::new(
            ProjectedPoint::new(min_x, min_y, std::f64::NEG_INFINITY),
            ProjectedPoint::new(max_x, max_y, std::f64::INFINITY),
        )
    }

    #[test]
    fn test_clamp_out_of_bounds() {
        let c = CameraConstraint::new(bounds(0.0, 0.0, 10.0, 10.0));
        let mut view = CameraView::default();
        view.position = ProjectedPoint::new(-5.0, -5.0, 100.0);
        view.target = ProjectedPoint::new(15.0, -1.0, -3.0);
        c.apply(&mut view);
        assert_eq!(view.position, ProjectedPoint::new(0.0, 0.25, 100.0));
        assert_eq!(view.target, ProjectedPoint::new(10.0, 0.0, -3.0));
    }

    #[test]
    fn test_clamp_is_idempotent() {
        let c = CameraConstraint::new(bounds(-2.0, 1.0, 3.0, 4.0));
        let mut once = CameraView::default();
        once.position = ProjectedPoint::new(7.0, -9.0, 2.0);
        once.target = ProjectedPoint::new(-8.0, 12.0, 0.0);
        c.apply(&mut once);
        let mut twice = once;
        c.apply(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_constraint_runs_on_every_change() {
        let mut controls = MapControls::new(CameraView::default());
        CameraConstraint::new(bounds(0.0, 0.0, 1.0, 1.0)).install(&mut controls);
        controls.update(&mut |view| view.position.x = 50.0);
        assert!(approx_eq(controls.view().position.x, 1.0));
        controls.update(&mut |view| view.target.y = -50.0);
        assert!(approx_eq(controls.view().target.y, 0.0));
        controls.update(&mut |view| view.position.y = -50.0);
        assert!(approx_eq(controls.view().position.y, 0.25));
    }

    #[test]
    fn test_framing_distance() {
        let b = bounds(0.0, 0.0, 4.0, 2.0);
        let expected = 2.0 / (45.0f64.to_radians()).tan() * 1.1;
        assert!(approx_eq(framing_distance(&b, 90.0).unwrap(), expected));
        assert!(approx_eq(framing_distance(&b, 90.0).unwrap(), 2.2));
    }

    #[test]
    fn test_degenerate_fov_is_rejected() {
        let b = bounds(0.0, 0.0, 4.0, 2.0);
        for &fov in &[0.0, -30.0, 180.0, 200.0, std::f64::NAN, std::f64::INFINITY] {
            match framing_distance(&b, fov) {
                Err(PipelineError::InvalidFieldOfView(_)) => {},
                other => panic!("fov {} should be rejected, got {:?}", fov, other),
            }
        }
        assert!(framing_distance(&b, 0.5).unwrap().is_finite());
        assert!(framing_distance(&b, 179.5).unwrap().is_finite());

        // the camera is left where it was
        let mut controls = MapControls::new(CameraView { fov: 0.0, ..CameraView::default() });
        assert!(frame_and_constrain(&mut controls, b).is_err());
        assert_eq!(controls.view().position, CameraView::default().position);
        let mut lock = TopDownLock::default();
        assert!(lock.set(true, Some(&b), &mut controls).is_err());
        assert_eq!(lock.state(), LockState::Free);
    }

    #[test]
    fn test_framing_distance_monotonic() {
        let mut last = 0.0;
        for size in 1..20 {
            let d = framing_distance(&bounds(0.0, 0.0, size as f64, 1.0), 75.0).unwrap();
            assert!(d > last);
            last = d;
        }
        let b = bounds(0.0, 0.0, 5.0, 3.0);
        let mut last = std::f64::INFINITY;
        for fov in (10..170).step_by(10) {
            let d = framing_distance(&b, fov as f64).unwrap();
            assert!(d < last);
            last = d;
        }
    }

    #[test]
    fn test_fov_for_viewport_width() {
        assert!(approx_eq(fov_for_viewport_width(320.0), 90.0));
        assert!(approx_eq(fov_for_viewport_width(900.0), 75.0));
        assert!(approx_eq(fov_for_viewport_width(2400.0), 60.0));
    }

    #[test]
    fn test_frame_and_constrain() {
        let b = bounds(-77.0, 40.0, -71.0, 46.0);
        let mut controls = MapControls::new(CameraView { fov: 90.0, ..CameraView::default() });
        frame_and_constrain(&mut controls, b).unwrap();
        let view = controls.view();
        assert!(approx_eq(view.position.x, -74.0));
        assert!(approx_eq(view.position.y, 43.0));
        assert!(approx_eq(view.position.z, 3.3));
        assert_eq!(view.target, ProjectedPoint::new(-74.0, 43.0, 0.0));

        controls.update(&mut |view| view.target.x = -100.0);
        assert!(approx_eq(controls.view().target.x, -77.0));
    }

    #[test]
    fn test_max_distance() {
        let view = CameraView {
            position: ProjectedPoint::new(0.0, 0.0, 1.0),
            max_distance: 4.5,
            ..CameraView::default()
        };
        let mut controls = MapControls::new(view);
        controls.update(&mut |view| view.position.z = 9.0);
        assert!(approx_eq(controls.view().position.z, 4.5));
    }

    #[test]
    fn test_lock_state_machine() {
        let b = bounds(0.0, 0.0, 4.0, 2.0);
        let mut controls = MapControls::new(CameraView { fov: 90.0, ..CameraView::default() });
        let mut lock = TopDownLock::default();
        assert_eq!(lock.state(), LockState::Free);

        lock.set(true, Some(&b), &mut controls).unwrap();
        assert!(lock.is_locked());
        assert_eq!(lock.snapshot(), Some(b));
        let locked_view = *controls.view();
        assert_eq!(locked_view.up, NORTH_UP);
        assert!(!locked_view.enable_rotate);
        assert!(locked_view.enable_pan);
        assert!(approx_eq(locked_view.position.x, 2.0));
        assert!(approx_eq(locked_view.position.y, 1.0));
        assert!(approx_eq(locked_view.position.z, 2.2));

        // entering the same state again changes nothing
        lock.set(true, Some(&b), &mut controls).unwrap();
        assert_eq!(*controls.view(), locked_view);

        lock.set(false, None, &mut controls).unwrap();
        assert_eq!(lock.state(), LockState::Free);
        assert_eq!(controls.view().up, Z_UP);
        assert!(controls.view().enable_rotate);
        let free_view = *controls.view();
        lock.set(false, None, &mut controls).unwrap();
        assert_eq!(*controls.view(), free_view);
    }

    #[test]
    fn test_lock_without_bounds() {
        let mut controls = MapControls::new(CameraView::default());
        let mut lock = TopDownLock::default();
        match lock.set(true, None, &mut controls) {
            Err(PipelineError::MissingBoundingBox) => {},
            other => panic!("expected MissingBoundingBox, got {:?}", other),
        }
        assert_eq!(lock.state(), LockState::Free);
    }

    #[test]
    fn test_keys() {
        let b = bounds(0.0, 0.0, 4.0, 2.0);
        let mut controls = MapControls::new(CameraView { fov: 90.0, ..CameraView::default() });
        let mut lock = TopDownLock::default();

        // panning is ignored while the camera is free
        assert!(!handle_key('w', &mut lock, Some(&b), &mut controls).unwrap());

        assert!(handle_key('L', &mut lock, Some(&b), &mut controls).unwrap());
        assert!(lock.is_locked());
        assert!(handle_key('d', &mut lock, Some(&b), &mut controls).unwrap());
        assert!(approx_eq(controls.view().position.x, 2.05));
        assert!(approx_eq(controls.view().target.x, 2.05));
        assert!(!handle_key('x', &mut lock, Some(&b), &mut controls).unwrap());

        assert!(handle_key('l', &mut lock, Some(&b), &mut controls).unwrap());
        assert!(!lock.is_locked());
    }
}
