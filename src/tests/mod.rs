mod helpers;
mod rate_limit;
