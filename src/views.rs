//! HTML rendering for the listing page.

use crate::services::image_service::ImagePage;
use minijinja::{Environment, context};

const LISTING_NAME: &str = "images-list.html";
const LISTING_TEMPLATE: &str = include_str!("../templates/images-list.html");

/// Render one listing page. Record fields are HTML-escaped.
pub fn render_listing(page: &ImagePage) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template(LISTING_NAME, LISTING_TEMPLATE)?;

    env.get_template(LISTING_NAME)?.render(context! {
        files => &page.images,
        page => page.page,
        total_pages => page.total_pages,
        order => page.order.as_str(),
    })
}
