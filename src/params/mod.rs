//! Parameter values, ordered parameter maps and compound-key routing
//!
//! Configuration reaches nested components through compound keys of the form
//! `prefix__key`. `module__num_units=20` is handed to the module factory as
//! `num_units=20`; `callbacks__print_log__sink="none"` reaches the callback
//! named `print_log`.
//!
//! ```
//! use skorch::params::{split_key, Params};
//!
//! assert_eq!(split_key("module__num_units"), ("module", Some("num_units")));
//!
//! let params = Params::new().with("lr", 0.1).with("module__num_units", 20);
//! assert_eq!(params.prefixed("module").get("num_units").and_then(|v| v.as_i64()), Some(20));
//! ```

mod router;
mod value;


pub use router::{route, split_key, RoutedParams, SEPARATOR};
pub use value::{ParamValue, Params};
