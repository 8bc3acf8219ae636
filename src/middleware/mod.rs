pub mod timing;

pub use timing::{identify_user, on_dispatch, timing_middleware, RequestUser};
