pub mod xp_flush;
