pub mod files_route;
