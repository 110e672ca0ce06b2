use gtk4::prelude::*;

use crate::session::Role;

/// Read/Stop pair on an assistant bubble. Only one is visible at a time.
#[derive(Clone)]
pub struct ReadControls {
    pub read: gtk4::Button,
    pub stop: gtk4::Button,
}

impl ReadControls {
    pub fn show_read(&self) {
        self.stop.set_visible(false);
        self.read.set_visible(true);
    }

    pub fn show_stop(&self) {
        self.read.set_visible(false);
        self.stop.set_visible(true);
    }
}

/// Handles for one rendered message.
pub struct BubbleWidgets {
    /// Full-width row appended to the chat box.
    pub row: gtk4::Box,
    pub label: gtk4::Label,
    pub copy: Option<gtk4::Button>,
    pub read_controls: Option<ReadControls>,
}

fn small_button(label: &str) -> gtk4::Button {
    let button = gtk4::Button::with_label(label);
    button.add_css_class("flat");
    button.set_width_request(80);
    button
}

fn message_label(text: &str) -> gtk4::Label {
    let label = gtk4::Label::new(Some(text));
    label.set_wrap(true);
    label.set_wrap_mode(gtk4::pango::WrapMode::WordChar);
    label.set_xalign(0.0);
    label.set_selectable(true);
    label.set_max_width_chars(80);
    label
}

/// Wrap `bubble` in a row aligned by role: assistant left, user right,
/// system centered.
fn aligned_row(bubble: &gtk4::Box, role: Role) -> gtk4::Box {
    let row = gtk4::Box::new(gtk4::Orientation::Horizontal, 0);
    bubble.set_halign(match role {
        Role::Assistant => gtk4::Align::Start,
        Role::User => gtk4::Align::End,
        Role::System => gtk4::Align::Center,
    });
    bubble.set_hexpand(true);
    row.append(bubble);
    row
}

/// Build a chat bubble with a Copy button, plus Read/Stop for assistant
/// messages. Handlers are connected by the caller.
pub fn build_message_bubble(role: Role, text: &str) -> BubbleWidgets {
    let bubble = gtk4::Box::new(gtk4::Orientation::Vertical, 4);
    bubble.add_css_class("bubble");
    bubble.add_css_class(match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    });

    let label = message_label(text);
    bubble.append(&label);

    let controls = gtk4::Box::new(gtk4::Orientation::Horizontal, 4);
    controls.set_halign(gtk4::Align::End);

    let copy = small_button("\u{1F4CB} Copy");
    controls.append(&copy);

    let read_controls = (role == Role::Assistant).then(|| {
        let read = small_button("\u{1F50A} Read");
        let stop = small_button("\u{26D4} Stop");
        stop.set_visible(false);
        controls.append(&read);
        controls.append(&stop);
        ReadControls { read, stop }
    });

    bubble.append(&controls);

    BubbleWidgets {
        row: aligned_row(&bubble, role),
        label,
        copy: Some(copy),
        read_controls,
    }
}

/// Assistant bubble without controls that grows while a reply streams in.
pub fn build_placeholder_bubble() -> BubbleWidgets {
    let bubble = gtk4::Box::new(gtk4::Orientation::Vertical, 4);
    bubble.add_css_class("bubble");
    bubble.add_css_class("assistant");
    let label = message_label("\u{2026}");
    bubble.append(&label);

    BubbleWidgets {
        row: aligned_row(&bubble, Role::Assistant),
        label,
        copy: None,
        read_controls: None,
    }
}

/// Centered notice for errors and hints. Not part of any session.
pub fn build_notice(text: &str) -> gtk4::Box {
    let bubble = gtk4::Box::new(gtk4::Orientation::Vertical, 0);
    bubble.add_css_class("bubble");
    bubble.add_css_class("system");
    let label = gtk4::Label::new(Some(text));
    label.set_wrap(true);
    bubble.append(&label);
    aligned_row(&bubble, Role::System)
}
