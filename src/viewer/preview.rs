//! File preview state machine.
//!
//! ```text
//!            select(i)              select(j)
//!   Idle ───────────────▶ Previewing(i) ───────▶ Previewing(j)
//!    ▲                        │
//!    └──────── close ─────────┘
//! ```
//!
//! There is no terminal state; the machine lives as long as its view.

use super::BinaryResource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewState {
    #[default]
    Idle,
    /// Index into the view's file list.
    Previewing(usize),
}

impl PreviewState {
    /// Enter the preview, or replace the previewed file without closing.
    pub fn select(&mut self, index: usize) {
        *self = PreviewState::Previewing(index);
    }

    pub fn close(&mut self) {
        *self = PreviewState::Idle;
    }

    pub fn selected(&self) -> Option<usize> {
        match self {
            PreviewState::Idle => None,
            PreviewState::Previewing(index) => Some(*index),
        }
    }
}

/// What the preview dialog shows for a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewBody {
    /// Inline image, as a `data:` URL.
    Image { src: String },
    /// Generic placeholder with a file icon.
    Unavailable,
}

pub fn preview_body(file: &BinaryResource) -> PreviewBody {
    if file.is_image() {
        PreviewBody::Image {
            src: file.data_url(),
        }
    } else {
        PreviewBody::Unavailable
    }
}
