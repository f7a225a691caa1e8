mod create;
mod manage;
mod sync;
