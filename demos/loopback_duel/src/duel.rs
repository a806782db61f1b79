//! Toy fighting game used to drive the demo
//!
//! Positions and velocities are fixed-point integers so both peers step
//! bit-for-bit identically.

use riposte_core::{Checksum, ChecksumBuilder, InputBits, Simulation};

const STAGE_HALF_WIDTH: i32 = 40_000;
const WALK_SPEED: i32 = 180;
const JUMP_SPEED: i32 = 900;
const GRAVITY: i32 = 60;
const REACH: i32 = 6_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fighter {
    pub x: i32,
    pub y: i32,
    pub vy: i32,
    pub hp: i32,
    pub cooldown: u8,
    pub blocking: bool,
}

impl Fighter {
    fn spawn(x: i32) -> Self {
        Self {
            x,
            y: 0,
            vy: 0,
            hp: 1000,
            cooldown: 0,
            blocking: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuelState {
    pub frame: u32,
    pub fighters: [Fighter; 2],
}

pub struct Duel {
    state: DuelState,
}

impl Duel {
    pub fn new() -> Self {
        Self {
            state: DuelState {
                frame: 0,
                fighters: [Fighter::spawn(-10_000), Fighter::spawn(10_000)],
            },
        }
    }

    pub fn state(&self) -> &DuelState {
        &self.state
    }

    fn attack_damage(input: InputBits) -> i32 {
        [
            (InputBits::PUNCH_HEAVY, 90),
            (InputBits::KICK_HEAVY, 80),
            (InputBits::PUNCH_MED, 50),
            (InputBits::KICK_MED, 45),
            (InputBits::PUNCH_WEAK, 20),
            (InputBits::KICK_WEAK, 20),
        ]
        .into_iter()
        .find(|(button, _)| input.contains(*button))
        .map_or(0, |(_, damage)| damage)
    }
}

impl Default for Duel {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation for Duel {
    type Snapshot = DuelState;

    fn snapshot(&self) -> DuelState {
        self.state.clone()
    }

    fn restore(&mut self, snapshot: &DuelState) {
        self.state = snapshot.clone();
    }

    fn step(&mut self, inputs: &[InputBits; 2]) {
        for (i, &input) in inputs.iter().enumerate() {
            let fighter = &mut self.state.fighters[i];
            fighter.blocking = input.contains(InputBits::BLOCK);
            if input.contains(InputBits::LEFT) {
                fighter.x -= WALK_SPEED;
            }
            if input.contains(InputBits::RIGHT) {
                fighter.x += WALK_SPEED;
            }
            fighter.x = fighter.x.clamp(-STAGE_HALF_WIDTH, STAGE_HALF_WIDTH);

            if input.contains(InputBits::UP) && fighter.y == 0 {
                fighter.vy = JUMP_SPEED;
            }
            fighter.y = (fighter.y + fighter.vy).max(0);
            fighter.vy = if fighter.y == 0 { 0 } else { fighter.vy - GRAVITY };
            fighter.cooldown = fighter.cooldown.saturating_sub(1);
        }

        for (i, &input) in inputs.iter().enumerate() {
            let damage = Self::attack_damage(input);
            let [a, b] = &mut self.state.fighters;
            let (attacker, defender) = if i == 0 { (a, b) } else { (b, a) };
            if damage == 0 || attacker.cooldown > 0 {
                continue;
            }
            attacker.cooldown = 20;
            if (attacker.x - defender.x).abs() <= REACH {
                let dealt = if defender.blocking { damage / 5 } else { damage };
                defender.hp = (defender.hp - dealt).max(0);
            }
        }

        self.state.frame += 1;
    }

    fn checksum(&self) -> Checksum {
        let mut builder = ChecksumBuilder::new();
        builder.write_u32(self.state.frame);
        for fighter in &self.state.fighters {
            builder
                .write_i32(fighter.x)
                .write_i32(fighter.y)
                .write_i32(fighter.vy)
                .write_i32(fighter.hp)
                .write_u8(fighter.cooldown)
                .write_u8(u8::from(fighter.blocking));
        }
        builder.finish()
    }

    fn signature(&self) -> f64 {
        self.state
            .fighters
            .iter()
            .map(|f| f64::from(f.x) + f64::from(f.y))
            .sum()
    }
}
