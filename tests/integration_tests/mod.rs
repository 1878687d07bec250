mod cache;
mod resolve;
