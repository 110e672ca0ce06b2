use gtk4::prelude::*;
use libadwaita::prelude::*;

/// Handles returned from building the main window.
pub struct MainWidgets {
    pub window: libadwaita::ApplicationWindow,
    // Sidebar
    pub new_chat_button: gtk4::Button,
    pub session_list: gtk4::ListBox,
    pub upload_button: gtk4::Button,
    pub voice_start_button: gtk4::Button,
    pub voice_stop_button: gtk4::Button,
    // Chat pane
    pub model_list: gtk4::StringList,
    pub model_dropdown: gtk4::DropDown,
    pub refresh_button: gtk4::Button,
    pub status_label: gtk4::Label,
    pub chat_scroll: gtk4::ScrolledWindow,
    pub chat_box: gtk4::Box,
    pub input_view: gtk4::TextView,
    pub send_button: gtk4::Button,
}

const CSS: &str = r#"
.bubble {
    border-radius: 12px;
    padding: 8px 12px;
}
.bubble.user {
    background-color: alpha(@accent_bg_color, 0.25);
}
.bubble.assistant {
    background-color: alpha(@view_fg_color, 0.08);
}
.bubble.system {
    background-color: alpha(@warning_bg_color, 0.2);
}
.input-box {
    border-radius: 8px;
    padding: 6px;
}
"#;

/// Build the main chat window: session sidebar on the left, chat on the right.
pub fn build_main_window(app: &libadwaita::Application, initial_status: &str) -> MainWidgets {
    let window = libadwaita::ApplicationWindow::builder()
        .application(app)
        .title("Local AI Assistant")
        .default_width(1100)
        .default_height(700)
        .build();

    let css_provider = gtk4::CssProvider::new();
    css_provider.load_from_string(CSS);
    if let Some(display) = gtk4::gdk::Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &css_provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }

    let toolbar_view = libadwaita::ToolbarView::new();
    let header = libadwaita::HeaderBar::new();
    toolbar_view.add_top_bar(&header);

    let paned = gtk4::Paned::new(gtk4::Orientation::Horizontal);
    paned.set_position(275);

    // --- Sidebar ---
    let sidebar = gtk4::Box::new(gtk4::Orientation::Vertical, 8);
    sidebar.set_margin_start(12);
    sidebar.set_margin_end(12);
    sidebar.set_margin_top(12);
    sidebar.set_margin_bottom(12);

    let new_chat_button = gtk4::Button::with_label("\u{2795} New Chat");
    new_chat_button.add_css_class("suggested-action");
    sidebar.append(&new_chat_button);

    let session_list = gtk4::ListBox::new();
    session_list.set_selection_mode(gtk4::SelectionMode::Single);
    session_list.add_css_class("navigation-sidebar");
    let session_scroll = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .vexpand(true)
        .child(&session_list)
        .build();
    sidebar.append(&session_scroll);

    let upload_button = gtk4::Button::with_label("\u{1F4CE} Upload File");
    let voice_start_button = gtk4::Button::with_label("\u{1F3A4} Start Voice");
    let voice_stop_button = gtk4::Button::with_label("\u{26D4} Stop Voice");
    sidebar.append(&upload_button);
    sidebar.append(&voice_start_button);
    sidebar.append(&voice_stop_button);

    paned.set_start_child(Some(&sidebar));
    paned.set_shrink_start_child(false);

    // --- Chat pane ---
    let content = gtk4::Box::new(gtk4::Orientation::Vertical, 8);
    content.set_margin_start(12);
    content.set_margin_end(12);
    content.set_margin_top(12);
    content.set_margin_bottom(12);

    let top_row = gtk4::Box::new(gtk4::Orientation::Horizontal, 8);
    let model_list = gtk4::StringList::new(&[]);
    let model_dropdown =
        gtk4::DropDown::new(Some(model_list.clone()), None::<gtk4::Expression>);
    model_dropdown.set_hexpand(true);
    let refresh_button = gtk4::Button::with_label("Refresh Models");
    top_row.append(&model_dropdown);
    top_row.append(&refresh_button);
    content.append(&top_row);

    let status_label = gtk4::Label::new(Some(initial_status));
    status_label.set_xalign(0.0);
    status_label.add_css_class("dim-label");
    content.append(&status_label);

    let chat_box = gtk4::Box::new(gtk4::Orientation::Vertical, 6);
    chat_box.set_valign(gtk4::Align::Start);
    let chat_scroll = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .vexpand(true)
        .child(&chat_box)
        .build();
    content.append(&chat_scroll);

    let input_row = gtk4::Box::new(gtk4::Orientation::Horizontal, 8);
    let input_view = gtk4::TextView::new();
    input_view.set_wrap_mode(gtk4::WrapMode::WordChar);
    input_view.add_css_class("input-box");
    let input_scroll = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .min_content_height(48)
        .max_content_height(160)
        .propagate_natural_height(true)
        .hexpand(true)
        .child(&input_view)
        .build();
    let send_button = gtk4::Button::with_label("Send");
    send_button.add_css_class("suggested-action");
    send_button.set_valign(gtk4::Align::End);
    input_row.append(&input_scroll);
    input_row.append(&send_button);
    content.append(&input_row);

    paned.set_end_child(Some(&content));
    paned.set_shrink_end_child(false);

    toolbar_view.set_content(Some(&paned));
    window.set_content(Some(&toolbar_view));

    MainWidgets {
        window,
        new_chat_button,
        session_list,
        upload_button,
        voice_start_button,
        voice_stop_button,
        model_list,
        model_dropdown,
        refresh_button,
        status_label,
        chat_scroll,
        chat_box,
        input_view,
        send_button,
    }
}
