pub mod couch;
pub mod nginx_errors;
pub mod nginx_timings;
pub mod touchforms;

pub use couch::CouchAccessParser;
pub use nginx_errors::NginxErrorParser;
pub use nginx_timings::NginxAccessParser;
pub use touchforms::TouchformsParser;
