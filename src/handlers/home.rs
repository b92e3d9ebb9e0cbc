use crate::view::{Locals, Page};
use axum::Extension;

pub async fn home(Extension(locals): Extension<Locals>) -> Page {
    Page::new("home", locals)
}
