//! webshot: Scroll-capture-stitch screenshots and visual regression for web
//! pages
//!
//! This library captures web content larger than the browser viewport by
//! scrolling a remote-controlled browser, capturing each viewport, and
//! stitching the frames into one seamless bitmap. Pages, single elements and
//! embedded frames can be captured. Captures can be compared against stored
//! baselines with a tolerance-based image diff, and everything is exposed
//! as a Model Context Protocol (MCP) server.

pub mod capture;
pub mod diff;
pub mod error;
pub mod geometry;
pub mod mcp;
pub mod mcp_content;
pub mod model;
pub mod regression;
pub mod snapshot;
pub mod util;
