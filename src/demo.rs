//! Example constructible types, used by the command-line driver and the
//! test suites. They double as a reference for hosts registering their own
//! types.

use crate::env::Environment;
use crate::error::Error;
use crate::factory::{Constructible, ParamSet};
use crate::registry;
use crate::value::Object;

/// `Cow(name("daisy"), age(4))`: a plain concrete type with one required
/// and one optional field.
#[derive(Debug, Default)]
pub struct Cow {
    pub name: String,
    pub age: i64,
}

impl Constructible for Cow {
    fn register_params(&self, params: &mut ParamSet) {
        params.field("name", |c: &mut Cow, v: String| c.name = v).required();
        params.field("age", |c: &mut Cow, v: i64| c.age = v);
    }
}

/// `Sheep(name("sleepy"), age(3))`, where `age` is a temporary: it has no
/// slot in the object and is picked up from the child environment in
/// [`post_init`](Constructible::post_init).
#[derive(Debug, Default)]
pub struct Sheep {
    pub name: String,
    pub age: Option<i64>,
}

impl Constructible for Sheep {
    fn register_params(&self, params: &mut ParamSet) {
        params.field("name", |s: &mut Sheep, v: String| s.name = v).required();
        params.temporary("age", "int");
    }

    fn post_init(&mut self, env: &Environment, _init_text: &str) -> Result<(), Error> {
        self.age = env.get::<i64>("age");
        Ok(())
    }
}

/// `DairyFarm(animals({Cow(...), ...}), prize(Cow(...)))`: object and
/// object-vector parameters, exercising nested construction.
#[derive(Debug, Default)]
pub struct DairyFarm {
    pub name: String,
    pub animals: Vec<Object>,
    pub prize: Option<Object>,
}

impl Constructible for DairyFarm {
    fn register_params(&self, params: &mut ParamSet) {
        params.field("name", |f: &mut DairyFarm, v: String| f.name = v);
        params
            .object_vec_field("animals", "Animal", |f: &mut DairyFarm, v| {
                f.animals = v
            })
            .required();
        params.object_field("prize", "Animal", |f: &mut DairyFarm, v| {
            f.prize = Some(v)
        });
    }
}

/// Registers every demo type. Safe to call more than once.
pub fn register_all() {
    registry::register::<Cow>("Animal", "Cow");
    registry::register::<Sheep>("Animal", "Sheep");
    registry::register::<DairyFarm>("Farm", "DairyFarm");
}
