//! Drives the frame loop by hand: a fixed-duration slide, then a
//! spring-driven move that gets retargeted mid-flight.
//!
//! ```sh
//! RUST_LOG=debug cargo run --example bounce
//! ```

use motive_animation::{
    Easing, Element, FrameLoop, Runner, Sequencer, SpringConfig, Timeline, When,
    DEFAULT_FRAME_MS,
};
use motive_core::{Matrix, Target};

#[derive(Default)]
struct Ball {
    x: f64,
    y: f64,
    matrix: Matrix,
}

impl Target for Ball {
    fn get(&self, prop: &str) -> f64 {
        match prop {
            "x" => self.x,
            "y" => self.y,
            _ => 0.0,
        }
    }

    fn set(&mut self, prop: &str, value: f64) {
        match prop {
            "x" => self.x = value,
            "y" => self.y = value,
            _ => {}
        }
    }

    fn matrix(&self) -> Matrix {
        self.matrix
    }

    fn set_matrix(&mut self, m: Matrix) {
        self.matrix = m;
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let frame_loop = FrameLoop::new();
    let timeline = Timeline::new(&frame_loop);
    let ball = Element::new(Ball::default(), &frame_loop);

    // a 500ms eased slide to x=200
    let slide = Runner::new(500.0);
    slide.borrow_mut().set_element(&ball);
    slide.borrow_mut().ease(Easing::QuadInOut);
    slide.borrow_mut().x(200.0);
    timeline.borrow_mut().schedule(&slide, 0.0, When::Now);

    // a spring chasing y=100; halfway through we change our mind
    let chase = Runner::declarative(SpringConfig::default());
    chase.borrow_mut().set_element(&ball);
    chase.borrow_mut().y(100.0);
    timeline.borrow_mut().schedule(&chase, 0.0, When::Now);

    for frame in 0..120 {
        if frame == 30 {
            println!("-- retargeting y to 40 --");
            chase.borrow_mut().y(40.0);
        }
        FrameLoop::tick(&frame_loop, DEFAULT_FRAME_MS);
        if frame % 10 == 0 {
            let b = ball.borrow();
            println!(
                "t={:4.0}ms  x={:7.2}  y={:7.2}",
                timeline.borrow().time(),
                b.get("x"),
                b.get("y"),
            );
        }
    }
}
