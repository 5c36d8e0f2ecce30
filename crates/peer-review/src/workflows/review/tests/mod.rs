mod common;
mod lifecycle;
mod selection;
