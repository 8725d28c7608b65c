//! Rendering context: object to text.
//!
//! Editing output is canonical and re-parseable; display output follows
//! the user's settings. Render hooks append to the context and never
//! allocate in the arena, so offsets stay valid throughout.

use crate::object;
use crate::runtime::Runtime;
use crate::settings::Settings;

pub struct Renderer<'a> {
    out: String,
    editing: bool,
    settings: &'a Settings,
}

impl<'a> Renderer<'a> {
    pub fn new(editing: bool, settings: &'a Settings) -> Self {
        Renderer {
            out: String::new(),
            editing,
            settings,
        }
    }

    pub fn editing(&self) -> bool {
        self.editing
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }

    pub fn push_str(&mut self, s: &str) {
        self.out.push_str(s);
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Renders the object at `off` to a fresh string.
pub fn render_object(rt: &Runtime, off: usize, editing: bool, settings: &Settings) -> String {
    let mut r = Renderer::new(editing, settings);
    object::render(rt, off, &mut r);
    r.finish()
}
