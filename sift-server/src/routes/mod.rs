mod default_handlers;
mod search;

use anyhow::Result;
use hyper::Body;
use routerify::Router;

use crate::error::SiftError;
use crate::state::State;

pub fn get_router(state: State) -> Result<Router<Body, SiftError>> {
    let router = Router::builder()
        .data(state)
        .get("/endpoints", search::list_endpoints)
        .get("/endpoints/:name/search", search::search)
        .post("/endpoints/:name/search/batch", search::search_batch)
        .err_handler(default_handlers::error_handler)
        .any(default_handlers::handle_404)
        .build()
        .map_err(|e| anyhow::anyhow!(e))?;

    Ok(router)
}
