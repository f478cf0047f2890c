pub mod status_rotation;
