#![allow(dead_code)]

pub mod mesh;
