pub(crate) mod export_controller;
pub(crate) mod health_check_controller;
