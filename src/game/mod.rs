pub mod clock;
pub mod constants;
pub mod game_loop;
pub mod input_buffer;
pub mod match_state;
pub mod spatial;
pub mod state;
pub mod systems;
