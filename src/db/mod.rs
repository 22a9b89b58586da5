pub mod lib_http;
pub mod prod_db;
pub mod timocom;
