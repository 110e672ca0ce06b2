use std::cell::RefCell;
use std::rc::Rc;

use gtk4::prelude::*;

use super::state::{update_status, AppState, BackendEvent, Status};

/// Fetch the model list from the inference server on the tokio runtime.
pub fn refresh_models(state: &Rc<RefCell<AppState>>) {
    update_status(state, Status::FetchingModels);
    set_model_names(state, &[], None);
    state.borrow_mut().current_model = None;

    let s = state.borrow();
    let client = s.ollama.clone();
    let sender = s.backend_sender.clone();

    s.tokio_rt.spawn(async move {
        let event = match client.list_models().await {
            Ok(models) => BackendEvent::ModelsLoaded(models),
            Err(e) => BackendEvent::ModelsFailed(e.to_string()),
        };
        let _ = sender.send(event).await;
    });
}

/// Populate the dropdown and pick the remembered model, else the first one.
pub fn on_models_loaded(state: &Rc<RefCell<AppState>>, models: Vec<String>) {
    log::info!("Found {} model(s)", models.len());
    if models.is_empty() {
        state.borrow_mut().models.clear();
        set_model_names(state, &[], None);
        update_status(state, Status::NoModels);
        return;
    }

    let remembered = state.borrow().config.default_model.clone();
    let selected = remembered
        .and_then(|name| models.iter().position(|m| *m == name))
        .unwrap_or(0);

    set_model_names(state, &models, Some(selected));
    {
        let mut s = state.borrow_mut();
        s.current_model = Some(models[selected].clone());
        s.models = models;
    }
    update_status(state, Status::ModelsLoaded);
}

pub fn on_models_failed(state: &Rc<RefCell<AppState>>, error: String) {
    log::warn!("Model listing failed: {error}");
    state.borrow_mut().models.clear();
    state.borrow_mut().current_model = None;
    update_status(state, Status::Offline(error));
}

/// The user picked a model in the dropdown. Remember it for next launch.
pub fn on_model_selected(state: &Rc<RefCell<AppState>>, index: u32) {
    let mut s = state.borrow_mut();
    if s.populating_models {
        return;
    }
    let Some(name) = s.models.get(index as usize).cloned() else {
        return;
    };
    log::info!("Model selected: {name}");
    s.current_model = Some(name.clone());
    s.config.default_model = Some(name);
    if let Err(e) = s.config.save() {
        log::warn!("Failed to save config: {e}");
    }
}

/// Replace the dropdown contents without triggering `on_model_selected`.
fn set_model_names(state: &Rc<RefCell<AppState>>, names: &[String], selected: Option<usize>) {
    let Some((list, dropdown)) = state
        .borrow()
        .window
        .as_ref()
        .map(|w| (w.model_list.clone(), w.model_dropdown.clone()))
    else {
        return;
    };

    state.borrow_mut().populating_models = true;
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    list.splice(0, list.n_items(), &names);
    if let Some(index) = selected {
        dropdown.set_selected(index as u32);
    }
    state.borrow_mut().populating_models = false;
}
