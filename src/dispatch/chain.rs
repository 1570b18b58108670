use std::path::PathBuf;

use tracing::{debug, warn};

use crate::dispatch::static_files::{self, FileLoad, StaticFetch};
use crate::http::request::{Method, Request};
use crate::http::response::{Response, StatusCode};

/// A request handler. Clearing the `bool` stops the chain after it.
pub type Handler = Box<dyn Fn(&Request, &mut Response<'_>, &mut bool) + Send + Sync>;

/// One registered entry. Registration order is dispatch order.
pub enum HandlerEntry {
    /// Runs for every request with the continue flag still set.
    General(Handler),
    /// Runs only on an exact method and path match.
    Router {
        method: Method,
        path: String,
        handler: Handler,
    },
    /// Serves GET and HEAD from a directory.
    StaticDirectory(PathBuf),
}

impl std::fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerEntry::General(_) => f.write_str("General"),
            HandlerEntry::Router { method, path, .. } => f
                .debug_struct("Router")
                .field("method", method)
                .field("path", path)
                .finish(),
            HandlerEntry::StaticDirectory(root) => {
                f.debug_tuple("StaticDirectory").field(root).finish()
            }
        }
    }
}

/// Where a dispatch ended up.
#[derive(Debug)]
pub enum Dispatch {
    /// The request was claimed, or answered with the 404 fallback.
    Done,
    /// A static directory needs a file read before the chain can go on.
    Suspended(StaticFetch),
}

/// The ordered handler registry consulted for every completed request.
///
/// Built once before serving and shared read-only between connections.
#[derive(Debug, Default)]
pub struct DispatchChain {
    entries: Vec<HandlerEntry>,
}

impl DispatchChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_general<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response<'_>, &mut bool) + Send + Sync + 'static,
    {
        self.entries.push(HandlerEntry::General(Box::new(handler)));
        self
    }

    pub fn add_router<F>(&mut self, method: Method, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response<'_>, &mut bool) + Send + Sync + 'static,
    {
        self.entries.push(HandlerEntry::Router {
            method,
            path: path.into(),
            handler: Box::new(handler),
        });
        self
    }

    pub fn add_static(&mut self, directory: impl Into<PathBuf>) -> &mut Self {
        self.entries.push(HandlerEntry::StaticDirectory(directory.into()));
        self
    }

    pub fn entries(&self) -> &[HandlerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs the chain from the first entry.
    pub fn dispatch(&self, request: &Request, response: &mut Response<'_>) -> Dispatch {
        self.run_from(0, request, response)
    }

    /// Applies a finished static lookup and, on a miss, continues the chain
    /// after the directory that suspended it.
    pub fn resume(
        &self,
        fetch: &StaticFetch,
        load: FileLoad,
        request: &Request,
        response: &mut Response<'_>,
    ) -> Dispatch {
        let mut should_continue = false;
        static_files::apply(fetch, load, response, &mut should_continue);
        debug!(should_continue, "static lookup applied");

        if should_continue {
            self.run_from(fetch.next_entry, request, response)
        } else {
            Dispatch::Done
        }
    }

    /// Dispatches with static reads performed on the calling thread.
    pub fn dispatch_blocking(&self, request: &Request, response: &mut Response<'_>) {
        let mut dispatch = self.dispatch(request, response);
        while let Dispatch::Suspended(fetch) = dispatch {
            let load = fetch.load_blocking();
            dispatch = self.resume(&fetch, load, request, response);
        }
    }

    fn run_from(&self, start: usize, request: &Request, response: &mut Response<'_>) -> Dispatch {
        let Some(path) = request.path() else {
            warn!(
                url = %String::from_utf8_lossy(request.url()),
                "no path in request, don't know what to do with it"
            );
            return Dispatch::Done;
        };
        let method = request.method();

        debug!(
            path = %String::from_utf8_lossy(path),
            start,
            entries = self.entries.len(),
            "dispatching request"
        );

        let mut should_continue = true;
        for (index, entry) in self.entries.iter().enumerate().skip(start) {
            match entry {
                HandlerEntry::General(handler) => {
                    handler(request, response, &mut should_continue);
                }
                HandlerEntry::Router {
                    method: route_method,
                    path: route_path,
                    handler,
                } => {
                    if method != Some(*route_method) {
                        debug!(index, "request method does not match router");
                    } else if route_path.as_bytes() == path {
                        should_continue = false;
                        debug!(index, path = %route_path, "calling router");
                        handler(request, response, &mut should_continue);
                    }
                }
                HandlerEntry::StaticDirectory(root) => {
                    if !matches!(method, Some(Method::GET | Method::HEAD)) {
                        debug!(index, "static directories only serve GET and HEAD");
                    } else if let Some(full) = static_files::resolve(root, path) {
                        debug!(index, path = %full.display(), "checking static directory");
                        return Dispatch::Suspended(StaticFetch::new(
                            full,
                            method == Some(Method::HEAD),
                            index + 1,
                        ));
                    }
                }
            }

            if !should_continue {
                debug!(index, "request handled");
                return Dispatch::Done;
            }
        }

        debug!(
            path = %String::from_utf8_lossy(path),
            "no handler claimed the request, sending 404"
        );
        let result = response
            .set_status(StatusCode::NOT_FOUND, None)
            .and_then(|_| response.clear_body())
            .and_then(|_| response.end());
        if let Err(e) = result {
            warn!(error = %e, "could not send 404");
        }
        Dispatch::Done
    }
}
