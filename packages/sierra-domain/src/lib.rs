pub mod defaults;
pub mod endpoint;
pub mod judgement_csv;
pub mod lab;
pub mod query_template;
pub mod registration;
pub mod rules;
pub mod votes;
