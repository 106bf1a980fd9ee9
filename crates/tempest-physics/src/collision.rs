//! Collision records and contact classification.
//!
//! Every body in the world carries a [`CollisionRecord`] in a side-table keyed
//! by its handle. During [`crate::PhysicsWorld::step`] the registered
//! [`ContactListener`] sees both records of each contact point and may flip
//! their `hit` flags; it never sees the particle pool itself.

use crate::BodyHandle;

/// What a body represents in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionKind {
    /// A weather particle owned by a pool slot.
    Particle,
    /// The static terrain.
    Terrain,
}

/// Tag attached to a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionRecord {
    /// Body kind.
    pub kind: CollisionKind,
    /// Pool slot owning the body, for particle bodies.
    pub particle: Option<usize>,
    /// Set when the body touched a body of a different kind.
    pub hit: bool,
}

impl CollisionRecord {
    /// Record for a particle body owned by pool slot `slot`.
    pub fn particle(slot: usize) -> Self {
        Self {
            kind: CollisionKind::Particle,
            particle: Some(slot),
            hit: false,
        }
    }

    /// Record for the terrain body.
    pub fn terrain() -> Self {
        Self {
            kind: CollisionKind::Terrain,
            particle: None,
            hit: false,
        }
    }
}

/// Answer a contact listener gives back to the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactResponse {
    /// The contact is resolved as the solver computed it.
    Unmodified,
}

/// Hook invoked synchronously from the physics step once per contact point.
///
/// Implementations must stay side-effect-light: flip flags on the records,
/// count, log at trace level. The records are copies that the world writes
/// back after the call.
pub trait ContactListener: Send + Sync {
    /// Called with both bodies of a contact and their records.
    fn on_contact(
        &mut self,
        a: (BodyHandle, &mut CollisionRecord),
        b: (BodyHandle, &mut CollisionRecord),
    ) -> ContactResponse;
}

/// Marks the particle side of a particle/terrain contact as hit.
///
/// Same-kind contacts (particle/particle, terrain/terrain) are ignored. The
/// response is always [`ContactResponse::Unmodified`].
pub fn classify_contact(a: &mut CollisionRecord, b: &mut CollisionRecord) -> ContactResponse {
    if a.kind != b.kind {
        if a.kind == CollisionKind::Particle {
            a.hit = true;
        } else if b.kind == CollisionKind::Particle {
            b.hit = true;
        }
    }
    ContactResponse::Unmodified
}

/// Default listener: classifies contacts and counts the hits it flagged.
#[derive(Debug, Default)]
pub struct CollisionClassifier {
    hits: u64,
}

impl CollisionClassifier {
    /// Creates a classifier with a zero hit count.
    pub fn new() -> Self {
        Self::default()
    }

    /// Particle/terrain contact points classified so far.
    pub fn hits(&self) -> u64 {
        self.hits
    }
}

impl ContactListener for CollisionClassifier {
    fn on_contact(
        &mut self,
        (_, a): (BodyHandle, &mut CollisionRecord),
        (_, b): (BodyHandle, &mut CollisionRecord),
    ) -> ContactResponse {
        if a.kind != b.kind {
            self.hits += 1;
        }
        classify_contact(a, b)
    }
}
