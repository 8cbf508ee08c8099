mod error;

pub use error::*;
pub use uuid::Uuid;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

/// 最少门数
pub const MIN_DOORS: u32 = 3;

/// 一轮游戏所处的阶段
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
pub enum Phase {
    /// 等待挑战者选门
    Start,

    /// 已揭示一扇门，等待挑战者抉择
    Decision,

    /// 本轮结束
    End,
}

/// 一轮游戏的结局
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
pub enum Outcome {
    /// 尚未决出
    Undetermined,

    /// 赢得奖品
    Win,

    /// 未赢得奖品
    Lose,
}

impl Default for Outcome {
    fn default() -> Self {
        Self::Undetermined
    }
}

impl Outcome {
    /// 展示给挑战者的结局文字
    pub fn message(&self) -> &'static str {
        match self {
            Outcome::Undetermined => "",
            Outcome::Win => "You win the prize!",
            Outcome::Lose => "You are now a proud owner of a duck!",
        }
    }
}

/// 挑战者抉择
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
pub enum Decision {
    /// 改变选择
    Switch,

    /// 坚持选择
    Stay,
}

/// 一轮游戏的各个阶段，每个阶段只携带该阶段有意义的数据
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
pub enum Stage {
    /// 挑战者选择
    Start,

    /// 挑战者抉择
    Decision {
        /// 挑战者已经选择的门序号
        selected: u32,

        /// 主持人打开的门序号
        revealed: u32,
    },

    /// 游戏结束
    End { result: RoundResult },
}

impl Default for Stage {
    fn default() -> Self {
        Self::Start
    }
}

impl Stage {
    pub fn phase(&self) -> Phase {
        match self {
            Stage::Start => Phase::Start,
            Stage::Decision { .. } => Phase::Decision,
            Stage::End { .. } => Phase::End,
        }
    }
}

/// 一轮游戏的结果
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
pub struct RoundResult {
    /// 奖品所在门序号
    prize: u32,

    /// 挑战者选择门序号
    selected: u32,

    /// 主持人打开的门序号
    revealed: u32,

    /// 挑战者最终打开的门序号
    final_door: u32,

    /// 挑战者的抉择
    decision: Decision,

    outcome: Outcome,
}

impl RoundResult {
    pub fn prize(&self) -> u32 {
        self.prize
    }

    pub fn selected(&self) -> u32 {
        self.selected
    }

    pub fn revealed(&self) -> u32 {
        self.revealed
    }

    pub fn final_door(&self) -> u32 {
        self.final_door
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_win(&self) -> bool {
        self.outcome == Outcome::Win
    }
}

/// 提供给界面的只读状态快照，奖品位置仅在本轮结束后可见
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
pub struct Snapshot {
    pub doors: u32,
    pub phase: Phase,
    pub selected: Option<u32>,
    pub revealed: Option<u32>,
    pub outcome: Outcome,
    pub prize: Option<u32>,
}

/// 游戏设置
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
pub struct Settings {
    /// 门数
    pub doors: u32,

    /// 随机数种子，为空时使用系统熵
    pub seed: Option<u64>,
}

impl Settings {
    pub fn new(doors: u32, seed: Option<u64>) -> Self {
        Self { doors, seed }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(MIN_DOORS, None)
    }
}

/// 订阅句柄，用于取消订阅
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Subscription(Uuid);

type Observer = Box<dyn FnMut(&Snapshot) + Send>;

/// 游戏引擎
///
/// 持有一轮游戏的全部状态。每次状态变化后按订阅顺序通知所有观察者，
/// 失败的操作不会修改状态，也不会发出通知。
pub struct GameEngine<R = ChaCha8Rng> {
    /// 门数
    doors: u32,
    /// 当前轮奖品所在门序号
    prize: u32,
    /// 当前轮状态
    stage: Stage,
    rng: R,
    observers: Vec<(Subscription, Observer)>,
}

impl<R> fmt::Debug for GameEngine<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameEngine")
            .field("doors", &self.doors)
            .field("stage", &self.stage)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl GameEngine {
    /// 以系统熵作为随机源创建引擎
    pub fn new(doors: u32) -> Result<Self> {
        Self::with_rng(doors, ChaCha8Rng::from_entropy())
    }

    /// 以固定种子创建引擎，相同种子产生相同的游戏过程
    pub fn with_seed(doors: u32, seed: u64) -> Result<Self> {
        Self::with_rng(doors, ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_settings(settings: Settings) -> Result<Self> {
        match settings.seed {
            Some(seed) => Self::with_seed(settings.doors, seed),
            None => Self::new(settings.doors),
        }
    }
}

impl<R: Rng> GameEngine<R> {
    /// 使用指定随机源创建引擎并将奖品随机放到一个门内
    pub fn with_rng(doors: u32, mut rng: R) -> Result<Self> {
        check_doors(doors)?;
        let prize = rng.gen_range(0..doors);
        debug!(doors, "new round");
        Ok(Self {
            doors,
            prize,
            stage: Stage::Start,
            rng,
            observers: vec![],
        })
    }

    /// 门数
    pub fn doors(&self) -> u32 {
        self.doors
    }

    pub fn phase(&self) -> Phase {
        self.stage.phase()
    }

    /// 当前轮状态
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// 当前状态快照
    pub fn snapshot(&self) -> Snapshot {
        let (selected, revealed, outcome, prize) = match self.stage {
            Stage::Start => (None, None, Outcome::Undetermined, None),
            Stage::Decision { selected, revealed } => {
                (Some(selected), Some(revealed), Outcome::Undetermined, None)
            }
            Stage::End { result } => (
                Some(result.selected),
                Some(result.revealed),
                result.outcome,
                Some(result.prize),
            ),
        };

        Snapshot {
            doors: self.doors,
            phase: self.stage.phase(),
            selected,
            revealed,
            outcome,
            prize,
        }
    }

    /// 订阅状态变化
    pub fn subscribe<F>(&mut self, observer: F) -> Subscription
    where
        F: FnMut(&Snapshot) + Send + 'static,
    {
        let subscription = Subscription(Uuid::new_v4());
        self.observers.push((subscription, Box::new(observer)));
        subscription
    }

    /// 取消订阅，返回 `false` 表示该订阅不存在
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(s, _)| *s != subscription);
        self.observers.len() != before
    }

    /// 挑战者选择一扇门，主持人随即打开另一扇既不是奖品也不是所选的门
    pub fn select_door(&mut self, index: u32) -> Result<()> {
        self.check_index(index)?;
        match self.stage {
            Stage::Start => {
                self.enter_decision(index);
                Ok(())
            }
            _ => Err(Error::InvalidState),
        }
    }

    /// 挑战者随机选择
    pub fn select_random(&mut self) -> Result<u32> {
        match self.stage {
            Stage::Start => {
                let selected = self.rng.gen_range(0..self.doors);
                self.enter_decision(selected);
                Ok(selected)
            }
            _ => Err(Error::InvalidState),
        }
    }

    /// 挑战者做出最终抉择
    ///
    /// 三扇门时改变选择的目标是唯一的；门数更多时需要用 [`GameEngine::switch_to`] 指定目标。
    pub fn resolve(&mut self, decision: Decision) -> Result<RoundResult> {
        let (selected, revealed) = self.decision_doors()?;
        let final_door = match decision {
            Decision::Stay => selected,
            Decision::Switch if self.doors == MIN_DOORS => {
                // 三扇门序号之和为 0 + 1 + 2
                MIN_DOORS - selected - revealed
            }
            Decision::Switch => return Err(Error::AmbiguousSwitch { doors: self.doors }),
        };
        Ok(self.finish(selected, revealed, final_door, decision))
    }

    /// 挑战者改选指定的门
    pub fn switch_to(&mut self, index: u32) -> Result<RoundResult> {
        self.check_index(index)?;
        let (selected, revealed) = self.decision_doors()?;
        if index == selected || index == revealed {
            return Err(Error::InvalidSwitchTarget { index });
        }
        Ok(self.finish(selected, revealed, index, Decision::Switch))
    }

    /// 可以改选的门序号，非抉择阶段为空
    pub fn switch_targets(&self) -> Vec<u32> {
        match self.stage {
            Stage::Decision { selected, revealed } => (0..self.doors)
                .filter(|&door| door != selected && door != revealed)
                .collect(),
            _ => vec![],
        }
    }

    /// 重新开始一轮，门数可以改变
    pub fn reset(&mut self, doors: u32) -> Result<()> {
        check_doors(doors)?;
        let prize = self.rng.gen_range(0..doors);
        self.begin_round(doors, prize);
        Ok(())
    }

    /// 重新开始一轮并将奖品放到序号指定的门内
    pub fn reset_with_prize(&mut self, doors: u32, prize: u32) -> Result<()> {
        check_doors(doors)?;
        if prize >= doors {
            return Err(Error::OutOfRange {
                index: prize,
                doors,
            });
        }
        self.begin_round(doors, prize);
        Ok(())
    }

    fn check_index(&self, index: u32) -> Result<()> {
        if index >= self.doors {
            Err(Error::OutOfRange {
                index,
                doors: self.doors,
            })
        } else {
            Ok(())
        }
    }

    fn decision_doors(&self) -> Result<(u32, u32)> {
        match self.stage {
            Stage::Decision { selected, revealed } => Ok((selected, revealed)),
            _ => Err(Error::InvalidState),
        }
    }

    fn begin_round(&mut self, doors: u32, prize: u32) {
        self.doors = doors;
        self.prize = prize;
        self.stage = Stage::Start;
        debug!(doors, "new round");
        self.notify();
    }

    fn enter_decision(&mut self, selected: u32) {
        let revealed = random_door(&mut self.rng, self.doors, &[self.prize, selected]);
        self.stage = Stage::Decision { selected, revealed };
        debug!(selected, revealed, "door revealed");
        self.notify();
    }

    fn finish(
        &mut self,
        selected: u32,
        revealed: u32,
        final_door: u32,
        decision: Decision,
    ) -> RoundResult {
        let outcome = if final_door == self.prize {
            Outcome::Win
        } else {
            Outcome::Lose
        };
        let result = RoundResult {
            prize: self.prize,
            selected,
            revealed,
            final_door,
            decision,
            outcome,
        };
        self.stage = Stage::End { result };
        debug!(prize = self.prize, final_door, ?decision, ?outcome, "round resolved");
        self.notify();
        result
    }

    fn notify(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for (subscription, observer) in &mut self.observers {
            trace!(?subscription, phase = ?snapshot.phase, "notify");
            observer(&snapshot);
        }
    }
}

fn check_doors(doors: u32) -> Result<()> {
    if doors < MIN_DOORS {
        Err(Error::TooFewDoors { doors })
    } else {
        Ok(())
    }
}

// 在 [0, doors) 范围内均匀生成 excluded 之外的随机整数
fn random_door<R: Rng + ?Sized>(rng: &mut R, doors: u32, excluded: &[u32]) -> u32 {
    let mut excluded = excluded.to_vec();
    excluded.sort_unstable();
    excluded.dedup();
    assert!(
        excluded.iter().all(|&e| e < doors) && (excluded.len() as u32) < doors,
        "doors = {}, excluded = {:?}",
        doors,
        excluded
    );

    // 先在剩余门中取第 n 个，再按升序跳过被排除的门
    let mut door = rng.gen_range(0..doors - excluded.len() as u32);
    for e in excluded {
        if door >= e {
            door += 1;
        }
    }
    door
}
