use std::{cell::Cell, rc::Rc};

use tracing::{debug, trace};

use crate::car::Car;
use crate::controller::Controller;
use crate::devices::turn_command;
use crate::track::TrackSurface;

/// Fitness credited per tick a car takes part in.
pub const FITNESS_PER_TICK: f64 = 1.0;

/// Shared fitness accumulator.
///
/// The population increments its clone; whoever created it keeps another
/// clone and reads the total once the car is gone.
#[derive(Debug, Clone, Default)]
pub struct Fitness(Rc<Cell<f64>>);

impl Fitness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> f64 {
        self.0.get()
    }

    pub fn add(&self, amount: f64) {
        self.0.set(self.0.get() + amount);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    Running,
    /// No car is left; the round is finished.
    RoundOver,
}

/// The cars of one round together with their controllers and fitness.
///
/// The three collections are index-aligned: entry `i` of each belongs to the
/// same car, and removal keeps them that way.
pub struct Population<C> {
    cars: Vec<Car>,
    controllers: Vec<C>,
    fitness: Vec<Fitness>,
}

impl<C> Default for Population<C> {
    fn default() -> Self {
        Self {
            cars: Vec::new(),
            controllers: Vec::new(),
            fitness: Vec::new(),
        }
    }
}

impl<C: Controller> Population<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, car: Car, controller: C, fitness: Fitness) {
        self.cars.push(car);
        self.controllers.push(controller);
        self.fitness.push(fitness);
    }

    pub fn len(&self) -> usize {
        self.cars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cars.is_empty()
    }

    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    pub fn car_mut(&mut self, index: usize) -> Option<&mut Car> {
        self.cars.get_mut(index)
    }

    pub fn controllers(&self) -> &[C] {
        &self.controllers
    }

    pub fn fitness(&self) -> &[Fitness] {
        &self.fitness
    }

    /// Removes entry `index` from all three collections, keeping the order of
    /// the rest.
    ///
    /// Panics if `index` is out of bounds, like [`Vec::remove`].
    pub fn remove(&mut self, index: usize) -> (Car, C, Fitness) {
        (
            self.cars.remove(index),
            self.controllers.remove(index),
            self.fitness.remove(index),
        )
    }

    /// Drops every crashed car, returning how many went.
    pub fn remove_crashed(&mut self) -> usize {
        let before = self.len();
        for index in (0..self.len()).rev() {
            if !self.cars[index].is_alive() {
                self.remove(index);
            }
        }
        before - self.len()
    }

    /// Advance the round by one tick.
    ///
    /// Order: credit fitness to every entry, drop crashed cars, let each
    /// controller steer from the readings of the previous update, then update
    /// every car. Steering therefore lags sensing by one tick.
    pub fn tick(&mut self, track: &TrackSurface) -> TickStatus {
        for fitness in &self.fitness {
            fitness.add(FITNESS_PER_TICK);
        }

        let removed = self.remove_crashed();
        if removed > 0 {
            debug!(removed, remaining = self.len(), "removed crashed cars");
        }
        if self.is_empty() {
            return TickStatus::RoundOver;
        }

        for (car, controller) in self.cars.iter_mut().zip(&mut self.controllers) {
            let decision = controller.activate(&car.inputs());
            car.set_command(turn_command(&decision));
        }

        for car in &mut self.cars {
            car.update(track);
        }

        trace!(
            alive = self.cars.iter().filter(|car| car.is_alive()).count(),
            total = self.len(),
            "tick complete"
        );
        TickStatus::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::car::{CarParams, TurnCommand};
    use crate::controller::FnController;
    use crate::track::DEFAULT_BOUNDARY_COLOR;
    use bevy_math::Vec2;
    use image::RgbImage;

    type Steer = FnController<Box<dyn FnMut(&[f64; 5]) -> Vec<f64>>>;

    fn fixed(decision: [f64; 2]) -> Steer {
        FnController(Box::new(move |_: &[f64; 5]| decision.to_vec()))
    }

    fn open_track() -> TrackSurface {
        TrackSurface::new(
            RgbImage::from_pixel(1200, 1000, image::Rgb([40, 40, 40])),
            DEFAULT_BOUNDARY_COLOR,
        )
    }

    fn car_at(x: f32) -> Car {
        Car::new(Vec2::new(x, 500.0), 0.0, CarParams::default())
    }

    #[test]
    fn remove_keeps_collections_aligned() {
        let mut population = Population::new();
        let fitness: Vec<Fitness> = (0..4).map(|_| Fitness::new()).collect();
        for (i, f) in fitness.iter().enumerate() {
            f.add(i as f64);
            population.push(car_at(100.0 * i as f32), fixed([i as f64, 0.0]), f.clone());
        }

        let (car, mut controller, removed_fitness) = population.remove(1);
        assert_eq!(car.position().x, 100.0);
        assert_eq!(controller.activate(&[0.0; 5]), vec![1.0, 0.0]);
        assert_eq!(removed_fitness.get(), 1.0);

        assert_eq!(population.len(), 3);
        assert_eq!(population.controllers().len(), 3);
        assert_eq!(population.fitness().len(), 3);
        let xs: Vec<f32> = population.cars().iter().map(|c| c.position().x).collect();
        assert_eq!(xs, vec![0.0, 200.0, 300.0]);
        let scores: Vec<f64> = population.fitness().iter().map(Fitness::get).collect();
        assert_eq!(scores, vec![0.0, 2.0, 3.0]);
    }

    #[test]
    fn fitness_handles_share_the_count() {
        let outside = Fitness::new();
        let inside = outside.clone();
        inside.add(FITNESS_PER_TICK);
        inside.add(FITNESS_PER_TICK);
        assert_eq!(outside.get(), 2.0);
    }

    #[test]
    fn all_crashed_round_ends_after_one_tick_with_unit_fitness() {
        let track = open_track();
        let mut population = Population::new();
        let fitness: Vec<Fitness> = (0..3).map(|_| Fitness::new()).collect();
        for (i, f) in fitness.iter().enumerate() {
            population.push(car_at(300.0 + 100.0 * i as f32), fixed([0.0, 0.0]), f.clone());
        }
        for i in 0..3 {
            population.car_mut(i).unwrap().crash();
        }

        assert_eq!(population.tick(&track), TickStatus::RoundOver);
        assert!(population.is_empty());
        assert!(fitness.iter().all(|f| f.get() == 1.0));
    }

    #[test]
    fn crashed_cars_are_dropped_on_the_next_tick() {
        let track = open_track();
        let mut population = Population::new();
        let keep = Fitness::new();
        let lose = Fitness::new();
        population.push(car_at(300.0), fixed([0.0, 0.0]), lose.clone());
        population.push(car_at(600.0), fixed([0.0, 0.0]), keep.clone());

        assert_eq!(population.tick(&track), TickStatus::Running);
        population.car_mut(0).unwrap().crash();
        assert_eq!(population.tick(&track), TickStatus::Running);

        assert_eq!(population.len(), 1);
        assert_eq!(lose.get(), 2.0);
        assert_eq!(keep.get(), 2.0);
        assert!(population.cars()[0].position().x > 600.0);
    }

    #[test]
    fn decisions_use_previous_tick_readings() {
        let track = open_track();
        let seen: std::rc::Rc<std::cell::RefCell<Vec<[f64; 5]>>> = Default::default();
        let log = seen.clone();
        let controller: Steer = FnController(Box::new(move |inputs: &[f64; 5]| {
            log.borrow_mut().push(*inputs);
            vec![0.0, 0.9]
        }));

        let mut population = Population::new();
        population.push(car_at(600.0), controller, Fitness::new());

        population.tick(&track);
        population.tick(&track);

        let seen = seen.borrow();
        // First decision is made before any update has cast the radar.
        assert_eq!(seen[0], [0.0; 5]);
        assert_eq!(seen[1], [200.0; 5]);
        let car = &population.cars()[0];
        assert_eq!(car.command(), TurnCommand::Left);
        assert_eq!(car.heading_deg(), 10.0);
    }

    #[test]
    fn empty_population_reports_round_over() {
        let track = open_track();
        let mut population: Population<Steer> = Population::new();
        assert_eq!(population.tick(&track), TickStatus::RoundOver);
    }
}
