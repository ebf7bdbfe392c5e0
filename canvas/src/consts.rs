//! Shared numeric constants for the canvas crate.

// ── Boundary layout ─────────────────────────────────────────────

/// Height of a boundary header; the first member is stacked right below it.
pub const BOUNDARY_HEADER_HEIGHT: f64 = 42.0;

/// Vertical gap counted once per visible member when sizing a boundary.
pub const BOUNDARY_MEMBER_GAP: f64 = 5.0;

/// Extra width a boundary needs when its widest member is itself a boundary.
pub const NESTED_BOUNDARY_PAD: f64 = 10.0;

/// Horizontal inset of a nested boundary inside its parent (half the pad).
pub const NESTED_BOUNDARY_INSET: f64 = NESTED_BOUNDARY_PAD / 2.0;

// ── Drag resizing ───────────────────────────────────────────────

/// Height margin added to a top-level boundary eclipsed by a dragged object.
pub const DRAG_GROW_HEIGHT_MARGIN: f64 = 43.0;

/// Width margin added to a top-level boundary eclipsed by a dragged object.
pub const DRAG_GROW_WIDTH_MARGIN: f64 = 15.0;

/// Slack added to the canvas when a dragged object crosses its current edge.
pub const CANVAS_GROW_MARGIN: f64 = 100.0;

// ── Hit-testing ─────────────────────────────────────────────────

/// Pick radius in pixels around an anchor point.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

// ── Identifiers ─────────────────────────────────────────────────

/// Prefix of generated vertex ids.
pub const VERTEX_ID_PREFIX: char = 'V';

/// Prefix of generated edge ids.
pub const EDGE_ID_PREFIX: char = 'E';

/// Prefix of generated boundary ids.
pub const BOUNDARY_ID_PREFIX: char = 'B';

/// Infix joining a vertex id and a row index into a property connection key.
pub const CONNECT_KEY: &str = "Connected";
