pub use files::ready;
pub use service::Service;

mod files;
mod service;

#[cfg(test)]
mod test;
