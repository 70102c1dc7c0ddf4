//! Engine scenario tests

mod helpers;
