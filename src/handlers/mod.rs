// handlers/mod.rs - two security tiers
//
// Public (no auth): health, root, token issuance, registration.
// Protected (JWT auth): everything else; each handler checks the permission
// table for its resource before doing any work.
pub mod protected;
pub mod public;
