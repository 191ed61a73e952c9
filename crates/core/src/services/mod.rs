pub mod detail_service;
pub mod format_service;
pub mod registry_service;
pub mod subscription_service;
pub mod view_service;
