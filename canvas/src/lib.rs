//! Containment and connection-geometry engine for the graph diagram editor.
//!
//! The crate owns the document model and every rule that keeps it
//! consistent while objects are dragged, grouped, hidden and re-imported:
//! which boundary an object belongs to, how big each boundary must be, where
//! each edge endpoint sits, and which property rows the current view shows.
//! The host feeds normalized gestures in and renders the [`engine::Action`]s
//! that come back; it never computes geometry itself.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | [`engine::EngineCore`], the session, vertex lifecycle and drag gestures |
//! | [`doc`] | Vertex, edge and boundary records and the in-memory store |
//! | [`containment`] | Boundary membership, drop decisions and the resize cascade |
//! | [`connect`] | Anchor coordinates, edge routing and edge gestures |
//! | [`visibility`] | Full and reduced views |
//! | [`schema`] | Vertex type definitions and the consistency check |
//! | [`io`] | Graph document import and export |
//! | [`hit`] | Anchor hit-testing |
//! | [`input`] | Interaction mode state machine |
//! | [`geom`] | Points, boxes and path strings |
//! | [`config`] | Layout settings and environment overrides |
//! | [`consts`] | Fixed layout constants |
//! | [`error`] | Error types |

pub mod config;
pub mod connect;
pub mod consts;
pub mod containment;
pub mod doc;
pub mod engine;
pub mod error;
pub mod geom;
pub mod hit;
pub mod input;
pub mod io;
pub mod schema;
pub mod visibility;
